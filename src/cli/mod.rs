//! Command-line parsing for the performance trend viewer.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! fetching and normalization.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::chart::DEFAULT_Y_MAX_MS;
use crate::domain::{AlignmentMode, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS, TimestampPrecision};
use crate::report::LogFormat;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "perf-trends", version, about = "Performance-test latency trends")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch and normalize results, then print them.
    Log(LogArgs),
    /// Launch the interactive chart.
    ///
    /// Plots average/high/low latency per test over the trailing window, with a
    /// grouped legend for showing and hiding individual lines.
    Chart(ChartArgs),
}

/// Where to fetch results from.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Deployment root URL; the results directory resolves relative to it.
    #[arg(long, env = "PERF_TRENDS_BASE_URL")]
    pub base_url: Option<String>,

    /// Page URL to derive the deployment root from (origin + first path segment).
    ///
    /// Takes priority over `--base-url` / `PERF_TRENDS_BASE_URL` when given.
    #[arg(long)]
    pub page_url: Option<String>,

    /// Results directory under the deployment root.
    #[arg(long, default_value = crate::data::results::DEFAULT_RESULTS_DIR)]
    pub results_dir: String,

    /// Manifest filename inside the results directory.
    #[arg(long, default_value = crate::data::results::DEFAULT_MANIFEST)]
    pub manifest: String,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

/// How to normalize the fetched records.
#[derive(Debug, Args, Clone)]
pub struct PipelineArgs {
    /// Trailing window length in days (the window includes today and the day
    /// `window_days` ago).
    #[arg(
        short = 'w',
        long,
        default_value_t = DEFAULT_WINDOW_DAYS,
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_WINDOW_DAYS))
    )]
    pub window_days: u32,

    /// Fill every window day (placeholders for gaps) or keep only real records.
    #[arg(short = 'm', long, value_enum, default_value_t = AlignmentMode::Fill)]
    pub mode: AlignmentMode,

    /// Keep only the date, or the date plus time-of-day.
    #[arg(short = 'p', long, value_enum, default_value_t = TimestampPrecision::DateOnly)]
    pub precision: TimestampPrecision,
}

/// Options for `log`.
#[derive(Debug, Args, Clone)]
pub struct LogArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    pub format: LogFormat,
}

/// Options for `chart`.
#[derive(Debug, Args, Clone)]
pub struct ChartArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Upper bound of the latency axis (ms).
    #[arg(long, default_value_t = DEFAULT_Y_MAX_MS)]
    pub y_max: f64,

    /// Write tracing output to this file (the terminal is owned by the UI).
    #[arg(long, value_name = "FILE")]
    pub debug_log: Option<PathBuf>,
}
