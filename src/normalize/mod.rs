//! Normalization pipeline: raw records in, date-aligned series out.
//!
//! Steps, in order:
//! 1. group records by `filename` (first-seen order)
//! 2. compute each group's display label once
//! 3. parse every timestamp and project to a `NormalizedPoint`
//! 4. stable-sort each group by date
//! 5. align each group to the trailing window (fill or filter)
//!
//! The whole pipeline is total: unparsable timestamps become `date: None`
//! and simply never match a window day.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;

use crate::domain::{AlignmentMode, NormalizedPoint, PipelineConfig, RawRecord, SeriesMap};

pub mod calendar;
pub mod label;
pub mod timestamp;

pub use calendar::{Clock, FixedClock, SystemClock, trailing_window};
pub use label::title_case_label;
pub use timestamp::parse_timestamp;

/// Run the full pipeline against the clock's notion of "today".
pub fn normalize(records: &[RawRecord], config: &PipelineConfig, clock: &dyn Clock) -> SeriesMap {
    let window = trailing_window(clock.today(), config.window_days);
    let grouped = group_records(records, config);

    let mut out = SeriesMap::with_capacity(grouped.len());
    for (key, group) in grouped {
        let aligned = match config.alignment {
            AlignmentMode::Fill => fill_window(&group.points, &window, &group.name),
            AlignmentMode::Filter => filter_window(group.points, &window),
        };
        tracing::debug!(
            series = %key,
            points = aligned.len(),
            with_data = aligned.iter().filter(|p| p.has_data).count(),
            "aligned series"
        );
        out.insert(key, aligned);
    }
    out
}

/// One filename's points before alignment.
#[derive(Debug, Clone)]
pub struct SeriesGroup {
    pub name: String,
    pub points: Vec<NormalizedPoint>,
}

/// Group, label, parse and sort. Alignment is left to the caller.
pub fn group_records(records: &[RawRecord], config: &PipelineConfig) -> IndexMap<String, SeriesGroup> {
    let mut groups: IndexMap<String, SeriesGroup> = IndexMap::new();

    for record in records {
        let group = groups
            .entry(record.filename.clone())
            .or_insert_with(|| SeriesGroup {
                name: title_case_label(&record.filename),
                points: Vec::new(),
            });

        let date = parse_timestamp(&record.formatted_date, config.precision);
        if date.is_none() {
            tracing::warn!(
                series = %record.filename,
                formatted_date = %record.formatted_date,
                "unparsable timestamp; record will not match any window day"
            );
        }
        group.points.push(NormalizedPoint::from_record(record, date, &group.name));
    }

    for group in groups.values_mut() {
        group.points.sort_by(|a, b| cmp_dates(a.date, b.date));
    }

    groups
}

/// Valid dates ascending, invalid dates after all of them.
fn cmp_dates(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// One point per window day.
///
/// The earliest sorted record on a day supplies its values; the point itself is
/// stamped with the window day at midnight. Days with no record get a placeholder.
pub fn fill_window(points: &[NormalizedPoint], window: &[NaiveDate], name: &str) -> Vec<NormalizedPoint> {
    let mut by_day: HashMap<NaiveDate, &NormalizedPoint> = HashMap::new();
    for p in points {
        if let Some(day) = p.day() {
            by_day.entry(day).or_insert(p);
        }
    }

    window
        .iter()
        .map(|day| match by_day.get(day) {
            Some(existing) => NormalizedPoint {
                date: Some(day.and_time(NaiveTime::MIN)),
                average: existing.average,
                high: existing.high,
                low: existing.low,
                errors: existing.errors.clone(),
                has_data: true,
                name: name.to_string(),
            },
            None => NormalizedPoint::placeholder(*day, name),
        })
        .collect()
}

/// Keep only points whose calendar day is inside the window, in their sorted order.
pub fn filter_window(points: Vec<NormalizedPoint>, window: &[NaiveDate]) -> Vec<NormalizedPoint> {
    let (Some(&start), Some(&end)) = (window.first(), window.last()) else {
        return Vec::new();
    };
    points
        .into_iter()
        .filter(|p| p.day().is_some_and(|d| d >= start && d <= end))
        .collect()
}
