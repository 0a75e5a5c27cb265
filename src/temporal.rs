//! Timestamp parsing and calendar features.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Canonical timestamp format written to the cleaned table.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y", "%m/%d/%Y"];

/// Parses a timestamp in any accepted layout; `None` when nothing matches.
///
/// RFC 3339 input keeps its wall-clock time; the offset is discarded.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    pub fn of(ts: &NaiveDateTime) -> Self {
        // Monday = 0 .. Sunday = 6
        if ts.weekday().num_days_from_monday() >= 5 {
            DayType::Weekend
        } else {
            DayType::Weekday
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::Weekday => "Weekday",
            DayType::Weekend => "Weekend",
        }
    }
}

pub fn is_peak_hour(hour: u32, windows: &[(u32, u32)]) -> bool {
    windows
        .iter()
        .any(|&(start, end)| hour >= start && hour <= end)
}

/// Calendar columns derived from a parsed `order_date` column.
#[derive(Debug, Default, PartialEq)]
pub struct TemporalColumns {
    pub order_date: Vec<Option<String>>,
    pub day_type: Vec<Option<String>>,
    pub hour: Vec<Option<f64>>,
    pub peak_hour: Vec<Option<String>>,
    pub unparsable: usize,
}

/// Parses every raw date and derives the calendar columns.
///
/// Unparsable dates leave every derived cell of that row empty; the row
/// itself is kept.
pub fn extract_features(raw: &[Option<String>], peak_windows: &[(u32, u32)]) -> TemporalColumns {
    let mut out = TemporalColumns::default();

    for value in raw {
        let parsed = value.as_deref().and_then(parse_timestamp);
        if value.is_some() && parsed.is_none() {
            out.unparsable += 1;
        }

        match parsed {
            Some(ts) => {
                let hour = ts.hour();
                out.order_date.push(Some(ts.format(TIMESTAMP_FORMAT).to_string()));
                out.day_type.push(Some(DayType::of(&ts).as_str().to_string()));
                out.hour.push(Some(f64::from(hour)));
                let peak = if is_peak_hour(hour, peak_windows) { "Yes" } else { "No" };
                out.peak_hour.push(Some(peak.to_string()));
            }
            None => {
                out.order_date.push(None);
                out.day_type.push(None);
                out.hour.push(None);
                out.peak_hour.push(None);
            }
        }
    }

    out
}
