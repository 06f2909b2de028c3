//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - deserialized straight from the results documents
//! - passed through the normalization pipeline by value
//! - printed as JSON by the `log` command

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Trailing window length used when nothing else is configured.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Longest trailing window accepted (about ten years).
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// How each series is lined up against the trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentMode {
    /// Exactly one point per window day; days without a record get a placeholder.
    Fill,
    /// Keep only real records whose calendar day falls inside the window.
    Filter,
}

/// How much of the encoded timestamp survives parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum TimestampPrecision {
    /// Calendar date only; the time-of-day fields are discarded.
    #[serde(rename = "date")]
    #[value(name = "date")]
    DateOnly,
    /// Calendar date plus hour and minute (seconds are always zero).
    #[serde(rename = "datetime")]
    #[value(name = "datetime")]
    DateTime,
}

/// One unprocessed measurement entry, as found in a per-file results document.
///
/// Every field is optional on the wire. Missing strings become empty, missing
/// readings become `None`, and a missing (or `null`) error list becomes empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Series key (the test the record belongs to).
    #[serde(default)]
    pub filename: String,
    /// Encoded `H:MM_am_D_M_YYYY` timestamp.
    #[serde(default, rename = "formattedDate")]
    pub formatted_date: String,
    #[serde(default)]
    pub average: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    /// Opaque error descriptors reported by the test run.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One display-ready point: either a real reading or a synthesized placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPoint {
    /// `None` when the source timestamp could not be parsed.
    pub date: Option<NaiveDateTime>,
    pub average: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub errors: Vec<Value>,
    /// `false` only for fill-mode placeholders.
    pub has_data: bool,
    /// Human-readable series label.
    pub name: String,
}

impl NormalizedPoint {
    /// Project a raw record onto an already-parsed date.
    pub fn from_record(record: &RawRecord, date: Option<NaiveDateTime>, name: &str) -> Self {
        Self {
            date,
            average: record.average,
            high: record.high,
            low: record.low,
            errors: record.errors.clone(),
            has_data: true,
            name: name.to_string(),
        }
    }

    /// A placeholder for a window day that has no underlying record.
    pub fn placeholder(day: NaiveDate, name: &str) -> Self {
        Self {
            date: Some(day.and_time(NaiveTime::MIN)),
            average: None,
            high: None,
            low: None,
            errors: Vec::new(),
            has_data: false,
            name: name.to_string(),
        }
    }

    /// Calendar day of this point, if its date is valid.
    pub fn day(&self) -> Option<NaiveDate> {
        self.date.map(|d| d.date())
    }
}

/// Normalized output: series key (original filename) to its ordered points.
///
/// Iteration order is the order in which each filename was first seen.
pub type SeriesMap = IndexMap<String, Vec<NormalizedPoint>>;

/// Normalization settings for one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub window_days: u32,
    pub alignment: AlignmentMode,
    pub precision: TimestampPrecision,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            alignment: AlignmentMode::Fill,
            precision: TimestampPrecision::DateOnly,
        }
    }
}
