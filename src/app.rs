//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up tracing
//! - builds the results source and pipeline config
//! - hands off to the `log` printer or the `chart` TUI

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use reqwest::Url;
use tracing_subscriber::EnvFilter;

use crate::cli::{ChartArgs, Command, LogArgs, PipelineArgs, SourceArgs};
use crate::data::{HttpResultsSource, SourceConfig, deployment_base};
use crate::domain::PipelineConfig;
use crate::error::AppError;
use crate::normalize::SystemClock;

pub mod pipeline;

/// Entry point for the `perf-trends` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `perf-trends` and `perf-trends --base-url ...` behave like `perf-trends chart ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Log(args) => handle_log(args),
        Command::Chart(args) => handle_chart(args),
    }
}

fn handle_log(args: LogArgs) -> Result<(), AppError> {
    init_stderr_logging();

    let source = HttpResultsSource::new(&source_config_from_args(&args.source)?)?;
    let config = pipeline_config_from_args(&args.pipeline);

    let run = pipeline::run_pipeline(&source, &config, &SystemClock)?;
    println!("{}", crate::report::format_series(&run.series, args.format)?);
    Ok(())
}

fn handle_chart(args: ChartArgs) -> Result<(), AppError> {
    if let Some(path) = &args.debug_log {
        init_file_logging(path)?;
    }

    let source = HttpResultsSource::new(&source_config_from_args(&args.source)?)?;
    let config = pipeline_config_from_args(&args.pipeline);
    let settings = crate::tui::ChartSettings { y_max: args.y_max };

    crate::tui::run(Box::new(source), config, Box::new(SystemClock), settings)
}

pub fn pipeline_config_from_args(args: &PipelineArgs) -> PipelineConfig {
    PipelineConfig {
        window_days: args.window_days,
        alignment: args.mode,
        precision: args.precision,
    }
}

pub fn source_config_from_args(args: &SourceArgs) -> Result<SourceConfig, AppError> {
    // `--page-url` is only ever explicit, while the base URL may come from the
    // environment, so the page URL wins.
    let base_url = match (&args.page_url, &args.base_url) {
        (Some(page), _) => deployment_base(&parse_url(page, "--page-url")?),
        (None, Some(base)) => parse_url(base, "--base-url")?,
        (None, None) => {
            return Err(AppError::usage(
                "Missing results location: pass --base-url or --page-url, or set PERF_TRENDS_BASE_URL (.env).",
            ));
        }
    };

    Ok(SourceConfig {
        results_dir: args.results_dir.clone(),
        manifest: args.manifest.clone(),
        timeout: Duration::from_secs(args.timeout_secs.max(1)),
        ..SourceConfig::new(base_url)
    })
}

fn parse_url(raw: &str, flag: &str) -> Result<Url, AppError> {
    Url::parse(raw.trim()).map_err(|e| AppError::usage(format!("Invalid {flag} '{raw}': {e}")))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// `log` owns stdout for its output, so diagnostics go to stderr.
fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter())
        .init();
}

/// The TUI owns the terminal; tracing only goes to a file, and only when asked.
fn init_file_logging(path: &Path) -> Result<(), AppError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::usage(format!("Failed to open debug log '{}': {e}", path.display())))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_env_filter(env_filter())
        .init();
    tracing::info!(path = %path.display(), "perf-trends debug log started");
    Ok(())
}

/// Rewrite argv so `perf-trends` defaults to `perf-trends chart`.
///
/// Rules:
/// - `perf-trends`                       -> `perf-trends chart`
/// - `perf-trends --base-url URL ...`    -> `perf-trends chart --base-url URL ...`
/// - `perf-trends --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("chart".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "log" | "chart");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "chart flags".
    if arg1.starts_with('-') {
        argv.insert(1, "chart".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AlignmentMode, TimestampPrecision};
    use crate::error::EXIT_USAGE;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn source_args(base_url: Option<&str>, page_url: Option<&str>) -> SourceArgs {
        SourceArgs {
            base_url: base_url.map(str::to_string),
            page_url: page_url.map(str::to_string),
            results_dir: "results".to_string(),
            manifest: "files.json".to_string(),
            timeout_secs: 0,
        }
    }

    #[test]
    fn bare_invocation_opens_chart() {
        assert_eq!(rewrite_args(argv(&["perf-trends"])), argv(&["perf-trends", "chart"]));
        assert_eq!(
            rewrite_args(argv(&["perf-trends", "--base-url", "https://h/"])),
            argv(&["perf-trends", "chart", "--base-url", "https://h/"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(argv(&["perf-trends", "log"])), argv(&["perf-trends", "log"]));
        assert_eq!(rewrite_args(argv(&["perf-trends", "--help"])), argv(&["perf-trends", "--help"]));
    }

    #[test]
    fn base_url_alone_and_timeout_has_a_floor() {
        let config = source_config_from_args(&source_args(Some("https://ci.example.com/perf/"), None)).unwrap();
        assert_eq!(config.base_url.as_str(), "https://ci.example.com/perf/");
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(
            config.results_url().unwrap().as_str(),
            "https://ci.example.com/perf/results/"
        );
    }

    #[test]
    fn page_url_is_reduced_to_deployment_root() {
        let config =
            source_config_from_args(&source_args(None, Some("https://ci.example.com/perf/index.html"))).unwrap();
        assert_eq!(config.base_url.as_str(), "https://ci.example.com/perf/");
    }

    #[test]
    fn page_url_wins_over_base_url() {
        let config = source_config_from_args(&source_args(
            Some("https://ci.example.com/from-env/"),
            Some("https://ci.example.com/perf/index.html"),
        ))
        .unwrap();
        assert_eq!(config.base_url.as_str(), "https://ci.example.com/perf/");
    }

    #[test]
    fn missing_or_bad_location_is_a_usage_error() {
        assert_eq!(source_config_from_args(&source_args(None, None)).unwrap_err().exit_code(), EXIT_USAGE);
        assert_eq!(
            source_config_from_args(&source_args(Some("not a url"), None)).unwrap_err().exit_code(),
            EXIT_USAGE
        );
    }

    #[test]
    fn pipeline_args_map_one_to_one() {
        let config = pipeline_config_from_args(&PipelineArgs {
            window_days: 14,
            mode: AlignmentMode::Filter,
            precision: TimestampPrecision::DateTime,
        });
        assert_eq!(config.window_days, 14);
        assert_eq!(config.alignment, AlignmentMode::Filter);
        assert_eq!(config.precision, TimestampPrecision::DateTime);
    }
}
