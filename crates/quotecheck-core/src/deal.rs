use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const EMPTY_STATUS_KEY: &str = "(empty)";

/// One CRM deal row. Field names follow the mirrored table columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    #[serde(deserialize_with = "crate::deserialize_lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "crate::deserialize_lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "crate::deserialize_lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "crate::deserialize_lenient_string")]
    pub phase_id: String,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub quote_phase_first_started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub quote_phase_last_checked_at: Option<DateTime<Utc>>,
}

impl Deal {
    pub fn status_key(&self) -> String {
        status_key(&self.status)
    }

    /// True once the background history scan has processed this deal.
    pub fn history_checked(&self) -> bool {
        self.quote_phase_last_checked_at.is_some()
    }

    pub fn reached_quote_phase(&self) -> bool {
        self.quote_phase_first_started_at.is_some()
    }
}

/// Grouping key for status histograms: trimmed, lowercased, `(empty)` when blank.
pub fn status_key(status: &str) -> String {
    let key = status.trim().to_lowercase();
    if key.is_empty() {
        EMPTY_STATUS_KEY.to_string()
    } else {
        key
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = raw.parse::<DateTime<Utc>>() {
        return Some(ts);
    }
    // Postgres text output: "2026-02-03 09:15:00+00" or without offset.
    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
    }
}
