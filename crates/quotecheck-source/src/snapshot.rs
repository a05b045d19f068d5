use crate::range::CreatedRange;
use crate::{DealSource, SourceError};
use quotecheck_core::{Deal, RawPhaseRecord};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Offline export of one tenant's rows, in the same shapes the REST tables use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub quote_phase_id: Option<String>,
    #[serde(default)]
    pub global_quote_phase_id: Option<String>,
    #[serde(default)]
    pub phases: Vec<RawPhaseRecord>,
    #[serde(default)]
    pub deals: Vec<Deal>,
}

pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SourceError::SnapshotIo {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|source| SourceError::SnapshotParse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(
            event = "snapshot_loaded",
            path = %path.display(),
            phases = snapshot.phases.len(),
            deals = snapshot.deals.len()
        );
        Ok(Self::new(snapshot))
    }
}

impl DealSource for SnapshotSource {
    fn tenant_quote_phase_id(&self, _location_id: &str) -> Result<Option<String>, SourceError> {
        Ok(self.snapshot.quote_phase_id.clone())
    }

    fn global_quote_phase_id(&self) -> Result<Option<String>, SourceError> {
        Ok(self.snapshot.global_quote_phase_id.clone())
    }

    fn phases(&self, _location_id: &str) -> Result<Vec<RawPhaseRecord>, SourceError> {
        Ok(self.snapshot.phases.clone())
    }

    fn deals(&self, _location_id: &str, range: &CreatedRange) -> Result<Vec<Deal>, SourceError> {
        let mut deals: Vec<Deal> = self
            .snapshot
            .deals
            .iter()
            .filter(|deal| range.contains(deal.created_at))
            .cloned()
            .collect();
        deals.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(deals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve_quote_phase_id;
    use chrono::NaiveDate;
    use chrono_tz::Tz;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_snapshot(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp snapshot");
        file.write_all(content.as_bytes()).expect("write snapshot");
        file
    }

    fn february(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).expect("valid date")
    }

    #[test]
    fn filters_and_orders_deals_by_range() {
        let file = write_snapshot(
            r#"{
                "quote_phase_id": "p3",
                "phases": [{"id": "p3", "name": "Quote", "sort_order": 3}],
                "deals": [
                    {"id": "b", "created_at": "2026-02-02T10:00:00Z", "phase_id": "p3"},
                    {"id": "late", "created_at": "2026-02-03T00:00:00Z", "phase_id": "p3"},
                    {"id": "a", "created_at": "2026-02-02T10:00:00Z", "phase_id": "p3"},
                    {"id": "first", "created_at": "2026-02-01T00:00:00Z", "phase_id": "p3"},
                    {"id": "early", "created_at": "2026-01-31T23:59:59Z", "phase_id": "p3"}
                ]
            }"#,
        );
        let source = SnapshotSource::open(file.path()).expect("open snapshot");
        let range =
            CreatedRange::from_local_dates(february(1), february(2), Tz::UTC).expect("range");

        let ids: Vec<String> = source
            .deals("ignored", &range)
            .expect("deals")
            .into_iter()
            .map(|deal| deal.id)
            .collect();
        assert_eq!(ids, vec!["first", "a", "b"]);
        assert_eq!(source.phases("ignored").expect("phases").len(), 1);
        assert_eq!(
            resolve_quote_phase_id(&source, "ignored", "").expect("resolve"),
            "p3"
        );
    }

    #[test]
    fn falls_back_to_global_threshold() {
        let file = write_snapshot(r#"{"global_quote_phase_id": "p2"}"#);
        let source = SnapshotSource::open(file.path()).expect("open snapshot");
        assert_eq!(
            resolve_quote_phase_id(&source, "ignored", "").expect("resolve"),
            "p2"
        );
    }

    #[test]
    fn malformed_snapshot_is_a_parse_error() {
        let file = write_snapshot(r#"{"deals": {"id": "not-a-list"}}"#);
        let err = SnapshotSource::open(file.path())
            .err()
            .expect("malformed snapshot");
        assert!(matches!(err, SourceError::SnapshotParse { .. }));
    }

    #[test]
    fn missing_snapshot_is_an_io_error() {
        let err = SnapshotSource::open("/nonexistent/quotecheck/snapshot.json")
            .err()
            .expect("missing file");
        assert!(matches!(err, SourceError::SnapshotIo { .. }));
    }
}
