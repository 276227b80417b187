use std::fmt;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d-%m-%Y"];

/// Calendar month of a given year. Orders chronologically: year first,
/// then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthBucket {
    year: i32,
    month: u32,
}

impl MonthBucket {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// `"Mar 2024"`
    pub fn label(&self) -> String {
        format!(
            "{} {}",
            MONTH_ABBREVIATIONS[(self.month - 1) as usize],
            self.year
        )
    }
}

impl fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Parses a submission timestamp into local wall-clock time.
///
/// Offset-bearing RFC 3339 values are converted to the local time zone;
/// naive values are assumed to already be local.
pub fn parse_local(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Local).naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(timestamp);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub fn month_bucket(raw: &str) -> Option<MonthBucket> {
    parse_local(raw).map(|timestamp| MonthBucket::from_date(timestamp.date()))
}
