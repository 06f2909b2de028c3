//! Trailing date windows and the clock they are anchored to.

use chrono::{Days, Local, NaiveDate};

use crate::domain::MAX_WINDOW_DAYS;

/// Source of "today" for window computation.
///
/// Injected so the pipeline is a pure function of its input plus a fixed date.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock time in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Every calendar day from `today - window_days` through `today`, ascending.
///
/// Both endpoints are included, so the result has `window_days + 1` entries.
/// `window_days` is capped at [`MAX_WINDOW_DAYS`].
pub fn trailing_window(today: NaiveDate, window_days: u32) -> Vec<NaiveDate> {
    let window_days = window_days.min(MAX_WINDOW_DAYS);
    let start = today
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MIN);
    start.iter_days().take_while(|d| *d <= today).collect()
}
