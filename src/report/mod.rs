//! Reporting utilities for the `log` command.
//!
//! We keep formatting code in one place so output changes stay localized and
//! the pipeline itself never touches stdout.

use clap::ValueEnum;

use crate::domain::SeriesMap;
use crate::error::AppError;

/// Output shape of `perf-trends log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// The processed mapping, pretty-printed as JSON.
    Json,
    /// One line per series with point, data and error counts.
    Summary,
}

pub fn format_series(series: &SeriesMap, format: LogFormat) -> Result<String, AppError> {
    match format {
        LogFormat::Json => format_series_json(series),
        LogFormat::Summary => Ok(format_series_summary(series)),
    }
}

/// Pretty JSON: `{ "<filename>": [ { "date": ..., "hasData": ..., ... } ] }`.
pub fn format_series_json(series: &SeriesMap) -> Result<String, AppError> {
    serde_json::to_string_pretty(series)
        .map_err(|e| AppError::data(format!("Failed to serialize processed data: {e}")))
}

pub fn format_series_summary(series: &SeriesMap) -> String {
    let mut out = String::new();
    out.push_str("=== perf-trends - processed data ===\n");

    let width = series.keys().map(|k| k.len()).max().unwrap_or(0).max(6);
    out.push_str(&format!(
        "{:<width$}  {:>6}  {:>6}  {:>6}  {:>10}\n",
        "series", "points", "data", "errors", "avg(mean)"
    ));

    for (key, points) in series {
        let with_data = points.iter().filter(|p| p.has_data).count();
        let errors: usize = points.iter().map(|p| p.errors.len()).sum();
        let averages: Vec<f64> = points.iter().filter_map(|p| p.average).collect();
        let mean = if averages.is_empty() {
            "-".to_string()
        } else {
            format!("{:.1}", averages.iter().sum::<f64>() / averages.len() as f64)
        };
        out.push_str(&format!(
            "{key:<width$}  {:>6}  {with_data:>6}  {errors:>6}  {mean:>10}\n",
            points.len()
        ));
    }

    out
}
