use crate::SourceError;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt;

/// Half-open UTC creation-time interval `[start, end_exclusive)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreatedRange {
    pub start: DateTime<Utc>,
    pub end_exclusive: DateTime<Utc>,
}

impl CreatedRange {
    pub fn new(start: DateTime<Utc>, end_exclusive: DateTime<Utc>) -> Result<Self, SourceError> {
        if end_exclusive < start {
            return Err(SourceError::InvalidRange {
                start: start.to_rfc3339(),
                end: end_exclusive.to_rfc3339(),
            });
        }
        Ok(Self {
            start,
            end_exclusive,
        })
    }

    /// Inclusive local calendar days in `tz`, from local midnight of `start`
    /// up to local midnight after `end`.
    pub fn from_local_dates(start: NaiveDate, end: NaiveDate, tz: Tz) -> Result<Self, SourceError> {
        if end < start {
            return Err(SourceError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        let day_after_end = end.succ_opt().ok_or_else(|| SourceError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        })?;
        Self::new(
            local_midnight_utc(start, tz),
            local_midnight_utc(day_after_end, tz),
        )
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end_exclusive
    }

    pub fn start_param(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn end_param(&self) -> String {
        self.end_exclusive.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl fmt::Display for CreatedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_param(), self.end_param())
    }
}

/// IANA zone name to `Tz`. Blank input means UTC; unknown names yield `None`.
pub fn parse_timezone(name: &str) -> Option<Tz> {
    let name = name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case("utc") {
        return Some(Tz::UTC);
    }
    name.parse::<Tz>().ok()
}

/// Midnight of `date` in `tz` as a UTC instant. A midnight skipped by a DST
/// transition resolves to the first valid local hour after it.
fn local_midnight_utc(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=3)
        .map(|hours| midnight + Duration::hours(hours))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}
