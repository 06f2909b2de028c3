//! Encoded timestamp parsing.
//!
//! Results documents stamp each record with a token like `4:54_pm_8_7_2024`:
//! five `_`-separated fields `time, meridiem, day, month, year`, where `time`
//! is a 12-hour `H:MM` clock and the month is 1-based.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::TimestampPrecision;

/// Parse an encoded timestamp.
///
/// Returns `None` for anything that does not describe a real calendar date
/// (too few fields, non-numeric parts, out-of-range values). Fields beyond the
/// fifth are ignored. With `DateOnly` the clock fields are not inspected at all
/// and the result sits at midnight.
pub fn parse_timestamp(raw: &str, precision: TimestampPrecision) -> Option<NaiveDateTime> {
    let mut fields = raw.split('_');
    let time = fields.next()?;
    let meridiem = fields.next()?;
    let day: u32 = fields.next()?.trim().parse().ok()?;
    let month: u32 = fields.next()?.trim().parse().ok()?;
    let year: i32 = fields.next()?.trim().parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    match precision {
        TimestampPrecision::DateOnly => Some(date.and_time(NaiveTime::MIN)),
        TimestampPrecision::DateTime => Some(date.and_time(parse_clock(time, meridiem)?)),
    }
}

/// Convert a 12-hour `H:MM` clock plus `am`/`pm` into a 24-hour time.
fn parse_clock(time: &str, meridiem: &str) -> Option<NaiveTime> {
    let (hour, minute) = time.split_once(':')?;
    let mut hour: u32 = hour.trim().parse().ok()?;
    let minute: u32 = minute.trim().parse().ok()?;

    let meridiem = meridiem.trim();
    if meridiem.eq_ignore_ascii_case("pm") && hour < 12 {
        hour += 12;
    } else if meridiem.eq_ignore_ascii_case("am") && hour == 12 {
        hour = 0;
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}
