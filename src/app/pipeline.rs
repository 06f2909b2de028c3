//! Shared "fetch then normalize" logic used by both the `log` and `chart` front-ends.
//!
//! manifest fetch -> parallel document fetch -> group/parse/sort -> window alignment
//!
//! The front-ends only decide how to present the result.

use chrono::NaiveDate;

use crate::data::{ResultsSource, fetch_data};
use crate::domain::{PipelineConfig, SeriesMap};
use crate::error::AppError;
use crate::normalize::{Clock, FixedClock, normalize};

/// All computed outputs of a single fetch cycle.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub series: SeriesMap,
    /// Raw records fetched across all documents.
    pub record_count: usize,
    /// The "today" the window was anchored to.
    pub today: NaiveDate,
}

/// Fetch everything and normalize it.
///
/// Any fetch failure surfaces as a single "No data to display" error; the
/// underlying cause has already been logged by the fetch layer.
pub fn run_pipeline(
    source: &dyn ResultsSource,
    config: &PipelineConfig,
    clock: &dyn Clock,
) -> Result<RunOutput, AppError> {
    let records = fetch_data(source).ok_or_else(|| AppError::data("No data to display"))?;

    // Pin "today" once so the window and the reported date agree.
    let today = clock.today();
    let series = normalize(&records, config, &FixedClock(today));
    tracing::info!(
        series = series.len(),
        records = records.len(),
        %today,
        "normalized results"
    );

    Ok(RunOutput {
        series,
        record_count: records.len(),
        today,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AlignmentMode, RawRecord};
    use crate::error::EXIT_DATA;

    struct TwoFiles {
        fail_second: bool,
    }

    impl ResultsSource for TwoFiles {
        fn list_manifest(&self) -> Result<Vec<String>, AppError> {
            Ok(vec!["apiHealth.json".to_string(), "checkoutFlow.json".to_string()])
        }

        fn fetch_one(&self, file: &str) -> Result<Vec<RawRecord>, AppError> {
            if self.fail_second && file == "checkoutFlow.json" {
                return Err(AppError::data("HTTP 404"));
            }
            let filename = file.trim_end_matches(".json").to_string();
            Ok(vec![
                RawRecord {
                    filename: filename.clone(),
                    formatted_date: "9:00_am_9_8_2024".to_string(),
                    average: Some(10.0),
                    high: Some(20.0),
                    low: Some(5.0),
                    errors: Vec::new(),
                },
                RawRecord {
                    filename,
                    formatted_date: "9:00_am_1_1_2024".to_string(),
                    average: Some(99.0),
                    high: None,
                    low: None,
                    errors: Vec::new(),
                },
            ])
        }
    }

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2024, 8, 10).unwrap())
    }

    #[test]
    fn fetches_and_normalizes_every_file() {
        let config = PipelineConfig {
            alignment: AlignmentMode::Filter,
            ..PipelineConfig::default()
        };
        let run = run_pipeline(&TwoFiles { fail_second: false }, &config, &clock()).unwrap();
        assert_eq!(run.record_count, 4);
        assert_eq!(run.today, clock().0);
        let keys: Vec<&str> = run.series.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["apiHealth", "checkoutFlow"]);
        assert_eq!(run.series["apiHealth"].len(), 1);
        assert_eq!(run.series["apiHealth"][0].name, "Api Health");
    }

    #[test]
    fn any_failed_document_means_no_partial_output() {
        let err = run_pipeline(&TwoFiles { fail_second: true }, &PipelineConfig::default(), &clock())
            .unwrap_err();
        assert_eq!(err.exit_code(), EXIT_DATA);
        assert_eq!(err.to_string(), "No data to display");
    }
}
