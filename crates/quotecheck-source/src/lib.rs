pub mod postgrest;
pub mod range;
pub mod snapshot;

pub use postgrest::{PostgrestConfig, PostgrestSource};
pub use range::{parse_timezone, CreatedRange};
pub use snapshot::{Snapshot, SnapshotSource};

use quotecheck_core::{Deal, RawPhaseRecord};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {path} failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {path} returned {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },
    #[error("expected list response for {path}, got {found}")]
    UnexpectedShape { path: String, found: &'static str },
    #[error("failed to decode {what} row {index}: {source}")]
    Decode {
        what: &'static str,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read snapshot {path}: {source}")]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse snapshot {path}: {source}")]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid date range: end {end} is before start {start}")]
    InvalidRange { start: String, end: String },
}

/// Read-only access to one tenant's phase configuration and deal rows.
pub trait DealSource {
    /// Threshold phase id from the tenant-scoped config row, if any.
    fn tenant_quote_phase_id(&self, location_id: &str) -> Result<Option<String>, SourceError>;
    /// Threshold phase id from the global fallback config row, if any.
    fn global_quote_phase_id(&self) -> Result<Option<String>, SourceError>;
    fn phases(&self, location_id: &str) -> Result<Vec<RawPhaseRecord>, SourceError>;
    /// Deals created inside `range`, ordered by creation time then id.
    fn deals(&self, location_id: &str, range: &CreatedRange) -> Result<Vec<Deal>, SourceError>;
}

/// Explicit override, else the tenant config row, else the global row, else
/// empty (no threshold).
pub fn resolve_quote_phase_id<S>(
    source: &S,
    location_id: &str,
    explicit: &str,
) -> Result<String, SourceError>
where
    S: DealSource + ?Sized,
{
    let explicit = explicit.trim();
    if !explicit.is_empty() {
        debug!(event = "quote_phase_resolved", origin = "explicit", phase_id = %explicit);
        return Ok(explicit.to_string());
    }

    if let Some(value) = source.tenant_quote_phase_id(location_id)? {
        let value = value.trim();
        if !value.is_empty() {
            debug!(event = "quote_phase_resolved", origin = "tenant", phase_id = %value);
            return Ok(value.to_string());
        }
    }

    let value = source
        .global_quote_phase_id()?
        .map(|value| value.trim().to_string())
        .unwrap_or_default();
    debug!(event = "quote_phase_resolved", origin = "global", phase_id = %value);
    Ok(value)
}

pub(crate) fn decode_rows<T>(what: &'static str, rows: Vec<Value>) -> Result<Vec<T>, SourceError>
where
    T: serde::de::DeserializeOwned,
{
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            serde_json::from_value(row).map_err(|source| SourceError::Decode {
                what,
                index,
                source,
            })
        })
        .collect()
}
