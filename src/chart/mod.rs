//! Chart projection: series in, coloured datasets and a grouped legend out.
//!
//! Each series becomes three datasets (`"{filename} Average"`, `"... High"`,
//! `"... Low"`) sharing one hue, with lightness telling them apart. The legend
//! groups datasets by the first whitespace-delimited token of their label, and
//! `LegendState` remembers which labels the user has hidden.
//!
//! Nothing here draws; the TUI turns `PlotSeries` into pixels.

use std::collections::HashMap;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use plotters::style::{Color, HSLColor};

use crate::domain::{NormalizedPoint, SeriesMap};
use crate::normalize::trailing_window;

/// Default upper bound of the latency axis, in milliseconds.
pub const DEFAULT_Y_MAX_MS: f64 = 6000.0;

/// Which reading a dataset plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Average,
    High,
    Low,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Average, Metric::High, Metric::Low];

    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Average => "Average",
            Metric::High => "High",
            Metric::Low => "Low",
        }
    }

    /// HSL lightness (percent) used for this metric's line.
    pub fn lightness(self) -> f64 {
        match self {
            Metric::Average => 50.0,
            Metric::High => 70.0,
            Metric::Low => 30.0,
        }
    }

    pub fn value(self, point: &NormalizedPoint) -> Option<f64> {
        match self {
            Metric::Average => point.average,
            Metric::High => point.high,
            Metric::Low => point.low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// One line on the chart.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub label: String,
    pub metric: Metric,
    pub color: Rgb,
    /// `(date, value)` pairs; points with no reading are left out so the line
    /// spans the gap.
    pub points: Vec<(NaiveDateTime, f64)>,
}

/// Build the Average/High/Low datasets for every series, in series order.
pub fn build_datasets(series: &SeriesMap) -> Vec<Dataset> {
    let n = series.len().max(1) as f64;
    let mut out = Vec::with_capacity(series.len() * Metric::ALL.len());

    for (index, (filename, points)) in series.iter().enumerate() {
        let hue = index as f64 * 360.0 / n;
        for metric in Metric::ALL {
            out.push(Dataset {
                label: format!("{filename} {}", metric.display_name()),
                metric,
                color: series_color(hue, metric.lightness()),
                points: points
                    .iter()
                    .filter_map(|p| Some((p.date?, metric.value(p)?)))
                    .collect(),
            });
        }
    }

    out
}

/// Fully saturated colour at `hue_deg` degrees and `lightness_pct` percent.
pub fn series_color(hue_deg: f64, lightness_pct: f64) -> Rgb {
    let hsl = HSLColor(hue_deg.rem_euclid(360.0) / 360.0, 1.0, lightness_pct / 100.0);
    let (r, g, b) = hsl.to_backend_color().rgb;
    Rgb(r, g, b)
}

/// The legend group a dataset label belongs to.
pub fn legend_group_name(label: &str) -> &str {
    label.split_whitespace().next().unwrap_or("")
}

/// A legend box: one group name and the datasets listed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendGroup {
    pub name: String,
    /// Indices into the dataset slice, in dataset order.
    pub entries: Vec<usize>,
}

/// Group datasets for the legend, groups in first-seen order.
pub fn group_legend(datasets: &[Dataset]) -> Vec<LegendGroup> {
    let mut groups: Vec<LegendGroup> = Vec::new();
    for (index, dataset) in datasets.iter().enumerate() {
        let name = legend_group_name(&dataset.label);
        match groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.entries.push(index),
            None => groups.push(LegendGroup {
                name: name.to_string(),
                entries: vec![index],
            }),
        }
    }
    groups
}

/// Which dataset labels are hidden.
///
/// Keyed by label rather than index so the state survives a refetch that
/// reorders or adds series.
#[derive(Debug, Clone, Default)]
pub struct LegendState {
    hidden: HashMap<String, bool>,
}

impl LegendState {
    pub fn is_hidden(&self, label: &str) -> bool {
        self.hidden.get(label).copied().unwrap_or(false)
    }

    /// Flip a label's visibility; returns `true` if it is now hidden.
    pub fn toggle(&mut self, label: &str) -> bool {
        let now_hidden = !self.is_hidden(label);
        self.hidden.insert(label.to_string(), now_hidden);
        now_hidden
    }

    pub fn show_all(&mut self) {
        self.hidden.clear();
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.values().filter(|h| **h).count()
    }
}

/// The date span the x axis covers, as fractional days from its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFrame {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeFrame {
    /// The same trailing window the pipeline aligned against.
    pub fn trailing(today: NaiveDate, window_days: u32) -> Self {
        let window = trailing_window(today, window_days);
        Self {
            start: window.first().copied().unwrap_or(today),
            end: today,
        }
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        let span = (self.end - self.start).num_days().max(1) as f64;
        [0.0, span]
    }

    pub fn x_of(&self, at: NaiveDateTime) -> f64 {
        (at - self.start.and_time(NaiveTime::MIN)).num_minutes() as f64 / 1440.0
    }

    /// `Aug 7`-style tick label for an x value.
    pub fn format_x(&self, x: f64) -> String {
        if !x.is_finite() || x < 0.0 {
            return String::new();
        }
        self.start
            .checked_add_days(Days::new(x.round() as u64))
            .map(|d| d.format("%b %-d").to_string())
            .unwrap_or_default()
    }
}

/// A visible dataset, ready to draw.
#[derive(Debug, Clone)]
pub struct PlotSeries {
    pub color: Rgb,
    pub points: Vec<(f64, f64)>,
}

/// Project every non-hidden dataset onto the frame's x axis.
pub fn visible_series(datasets: &[Dataset], legend: &LegendState, frame: &TimeFrame) -> Vec<PlotSeries> {
    datasets
        .iter()
        .filter(|d| !legend.is_hidden(&d.label))
        .map(|d| PlotSeries {
            color: d.color,
            points: d.points.iter().map(|&(at, y)| (frame.x_of(at), y)).collect(),
        })
        .collect()
}
