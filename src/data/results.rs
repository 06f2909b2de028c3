//! Results endpoint integration.
//!
//! A deployment publishes a manifest (`{results_dir}/files.json`, a JSON array of
//! filenames) and one JSON document per listed file, each an array of raw records.
//! Every per-file document is fetched in parallel and the batch fails as a whole
//! if any single document cannot be fetched or decoded.

use std::time::Duration;

use rayon::prelude::*;
use reqwest::Url;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;

use crate::domain::RawRecord;
use crate::error::AppError;

pub const DEFAULT_RESULTS_DIR: &str = "results";
pub const DEFAULT_MANIFEST: &str = "files.json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the results live and how long to wait for them.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Deployment root; manifest and documents resolve relative to it.
    pub base_url: Url,
    pub results_dir: String,
    pub manifest: String,
    /// Per-request deadline.
    pub timeout: Duration,
}

impl SourceConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            results_dir: DEFAULT_RESULTS_DIR.to_string(),
            manifest: DEFAULT_MANIFEST.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// `{base}/{results_dir}/`, always with a trailing slash so joins stay inside it.
    pub fn results_url(&self) -> Result<Url, AppError> {
        let base = with_trailing_slash(self.base_url.clone());
        let dir = self.results_dir.trim_matches('/');
        if dir.is_empty() {
            return Ok(base);
        }
        base.join(&format!("{dir}/"))
            .map_err(|e| AppError::usage(format!("Invalid results dir '{}': {e}", self.results_dir)))
    }
}

/// The two calls the fetch orchestration needs from a results backend.
///
/// `Sync` because documents are fetched from several threads at once.
pub trait ResultsSource: Sync {
    /// Identifiers of every results document.
    fn list_manifest(&self) -> Result<Vec<String>, AppError>;

    /// All raw records in one results document.
    fn fetch_one(&self, file: &str) -> Result<Vec<RawRecord>, AppError>;
}

/// HTTP implementation backed by a blocking `reqwest` client.
pub struct HttpResultsSource {
    client: Client,
    results_url: Url,
    manifest: String,
}

impl HttpResultsSource {
    pub fn new(config: &SourceConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::usage(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            results_url: config.results_url()?,
            manifest: config.manifest.clone(),
        })
    }

    fn resolve(&self, name: &str) -> Result<Url, AppError> {
        self.results_url
            .join(name)
            .map_err(|e| AppError::data(format!("Invalid results path '{name}': {e}")))
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, AppError> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| AppError::data(format!("Request for {url} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::data(format!(
                "Request for {url} failed with status {}.",
                resp.status()
            )));
        }

        resp.json()
            .map_err(|e| AppError::data(format!("Failed to parse {url}: {e}")))
    }
}

impl ResultsSource for HttpResultsSource {
    fn list_manifest(&self) -> Result<Vec<String>, AppError> {
        let url = self.resolve(&self.manifest)?;
        tracing::debug!(%url, "fetching manifest");
        self.get_json(url)
    }

    fn fetch_one(&self, file: &str) -> Result<Vec<RawRecord>, AppError> {
        let url = self.resolve(file)?;
        tracing::debug!(%url, "fetching results document");
        self.get_json(url)
    }
}

/// Fetch the manifest, then every listed document, and flatten the records.
///
/// Records keep manifest order, then in-document order. Any failure (manifest
/// unavailable, empty manifest, a single bad document) fails the whole call.
pub fn try_fetch_data(source: &dyn ResultsSource) -> Result<Vec<RawRecord>, AppError> {
    let files = source.list_manifest()?;
    if files.is_empty() {
        return Err(AppError::data("No files found in manifest."));
    }
    tracing::info!(files = files.len(), "fetched manifest");

    let documents: Vec<Vec<RawRecord>> = files
        .par_iter()
        .map(|file| source.fetch_one(file))
        .collect::<Result<_, _>>()?;

    let records: Vec<RawRecord> = documents.into_iter().flatten().collect();
    tracing::info!(records = records.len(), "fetched results documents");
    Ok(records)
}

/// Like [`try_fetch_data`], but collapses every failure into "no data".
///
/// The cause is logged; callers only learn that nothing is available.
pub fn fetch_data(source: &dyn ResultsSource) -> Option<Vec<RawRecord>> {
    match try_fetch_data(source) {
        Ok(records) => Some(records),
        Err(err) => {
            tracing::error!(error = %err, "error fetching data");
            None
        }
    }
}

/// Derive the deployment root from a page URL: origin plus first path segment.
///
/// `https://host/perf/index.html` becomes `https://host/perf/`; a page at the
/// origin root (or directly under it) maps to `https://host/`.
pub fn deployment_base(page: &Url) -> Url {
    let mut base = page.clone();
    base.set_query(None);
    base.set_fragment(None);

    let segments: Vec<String> = page
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    // A lone segment without a trailing slash is a file only if it has an extension.
    let is_dir = page.path().ends_with('/');
    let path = match segments.first() {
        Some(first) if segments.len() > 1 || is_dir || !first.contains('.') => format!("/{first}/"),
        _ => "/".to_string(),
    };
    base.set_path(&path);
    base
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    struct FakeSource {
        manifest: Result<Vec<String>, String>,
        documents: HashMap<String, Result<Vec<RawRecord>, String>>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(files: &[&str]) -> Self {
            Self {
                manifest: Ok(files.iter().map(|f| f.to_string()).collect()),
                documents: HashMap::new(),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn with_doc(mut self, file: &str, averages: &[f64]) -> Self {
            let records = averages
                .iter()
                .map(|&a| RawRecord {
                    filename: file.to_string(),
                    formatted_date: "1:00_pm_9_8_2024".to_string(),
                    average: Some(a),
                    high: None,
                    low: None,
                    errors: Vec::new(),
                })
                .collect();
            self.documents.insert(file.to_string(), Ok(records));
            self
        }

        fn with_failure(mut self, file: &str) -> Self {
            self.documents.insert(file.to_string(), Err("HTTP 404".to_string()));
            self
        }
    }

    impl ResultsSource for FakeSource {
        fn list_manifest(&self) -> Result<Vec<String>, AppError> {
            self.manifest.clone().map_err(AppError::data)
        }

        fn fetch_one(&self, file: &str) -> Result<Vec<RawRecord>, AppError> {
            self.requested.lock().unwrap().push(file.to_string());
            match self.documents.get(file) {
                Some(Ok(records)) => Ok(records.clone()),
                Some(Err(msg)) => Err(AppError::data(msg.clone())),
                None => Err(AppError::data(format!("missing {file}"))),
            }
        }
    }

    fn averages(records: &[RawRecord]) -> Vec<f64> {
        records.iter().map(|r| r.average.unwrap()).collect()
    }

    #[test]
    fn records_follow_manifest_order() {
        let source = FakeSource::new(&["c.json", "a.json", "b.json"])
            .with_doc("a.json", &[1.0, 2.0])
            .with_doc("b.json", &[3.0])
            .with_doc("c.json", &[4.0, 5.0]);
        let records = try_fetch_data(&source).unwrap();
        assert_eq!(averages(&records), vec![4.0, 5.0, 1.0, 2.0, 3.0]);

        let mut requested = source.requested.lock().unwrap().clone();
        requested.sort();
        assert_eq!(requested, vec!["a.json", "b.json", "c.json"]);
    }

    #[test]
    fn one_failed_document_fails_the_batch() {
        let source = FakeSource::new(&["a.json", "b.json", "c.json"])
            .with_doc("a.json", &[1.0])
            .with_failure("b.json")
            .with_doc("c.json", &[3.0]);
        let err = try_fetch_data(&source).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_DATA);
        assert!(fetch_data(&source).is_none());
    }

    #[test]
    fn failed_or_empty_manifest_means_no_data() {
        let mut source = FakeSource::new(&[]);
        assert!(fetch_data(&source).is_none());
        assert!(source.requested.lock().unwrap().is_empty());

        source.manifest = Err("HTTP 500".to_string());
        assert!(fetch_data(&source).is_none());
    }

    #[test]
    fn empty_documents_are_fine() {
        let source = FakeSource::new(&["a.json"]).with_doc("a.json", &[]);
        assert_eq!(fetch_data(&source), Some(Vec::new()));
    }

    #[test]
    fn results_url_nests_under_base() {
        let config = SourceConfig::new(Url::parse("https://ci.example.com/perf").unwrap());
        let results = config.results_url().unwrap();
        assert_eq!(results.as_str(), "https://ci.example.com/perf/results/");
        assert_eq!(
            results.join("files.json").unwrap().as_str(),
            "https://ci.example.com/perf/results/files.json"
        );

        let flat = SourceConfig {
            results_dir: "/".to_string(),
            ..SourceConfig::new(Url::parse("https://ci.example.com/").unwrap())
        };
        assert_eq!(flat.results_url().unwrap().as_str(), "https://ci.example.com/");
    }

    #[test]
    fn deployment_base_keeps_first_segment() {
        let base = |s: &str| deployment_base(&Url::parse(s).unwrap()).to_string();
        assert_eq!(base("https://host/perf/index.html"), "https://host/perf/");
        assert_eq!(base("https://host/perf/deep/page.html?x=1#top"), "https://host/perf/");
        assert_eq!(base("https://host/perf/"), "https://host/perf/");
        assert_eq!(base("https://host/index.html"), "https://host/");
        assert_eq!(base("https://user.github.io/timecheck"), "https://user.github.io/timecheck/");
        assert_eq!(base("https://user.github.io/timecheck?tab=1"), "https://user.github.io/timecheck/");
        assert_eq!(base("https://host/"), "https://host/");
        assert_eq!(base("http://localhost:8080/app/"), "http://localhost:8080/app/");
    }
}
