use chrono::{DateTime, Duration, TimeZone, Utc};
use quotecheck_core::{Deal, PhaseRegistry, QuoteThreshold, RawPhaseRecord};
use quotecheck_engine::{
    classify, reconcile, DumpSelection, HistoryBucket, QuoteReport, ReportConfig,
};
use serde_json::json;

fn ts(offset_minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0)
        .single()
        .expect("valid timestamp")
        + Duration::minutes(offset_minutes)
}

fn pipeline() -> PhaseRegistry {
    let rows: Vec<RawPhaseRecord> = serde_json::from_value(json!([
        {"id": "P1", "name": "Lead", "sort_order": 1, "probability": 10},
        {"id": "P2", "name": "Visit", "sort_order": "2", "probability": 25},
        {"id": "P3", "name": "Quote", "sort_order": 3, "probability": 50},
        {"id": "P4", "name": "Signed", "sort_order": 4.0, "probability": 100},
    ]))
    .expect("phase rows");
    PhaseRegistry::from_records(&rows)
}

fn deal(id: &str, minute: i64, phase_id: &str) -> Deal {
    Deal {
        id: id.to_string(),
        created_at: ts(minute),
        title: format!("Deal {id}"),
        status: "open".to_string(),
        phase_id: phase_id.to_string(),
        quote_phase_first_started_at: None,
        quote_phase_last_checked_at: None,
    }
}

#[test]
fn ordinal_threshold_scenario() {
    let registry = pipeline();
    let threshold = QuoteThreshold::resolve("P3", &registry);
    assert_eq!(threshold.sort_order, Some(3));

    assert!(!classify("P2", &registry, &threshold));
    assert!(classify("P4", &registry, &threshold));
    assert!(!classify("PX", &registry, &threshold));
}

#[test]
fn missing_threshold_counts_every_deal() {
    let registry = pipeline();
    let threshold = QuoteThreshold::resolve("", &registry);
    let deals = vec![
        deal("d1", 0, "P1"),
        deal("d2", 1, "P4"),
        deal("d3", 2, ""),
        deal("d4", 3, "PX"),
        deal("d5", 4, "  "),
    ];

    let reconciliation = reconcile(&deals, &registry, &threshold);
    let report = QuoteReport::build(
        &reconciliation,
        &registry,
        &threshold,
        &ReportConfig::default(),
    );

    assert_eq!(report.quote, 5);
    assert_eq!(report.non_quote, 0);
    assert_eq!(reconciliation.ids(DumpSelection::Quote).len(), 5);
    assert!(reconciliation.ids(DumpSelection::NonQuote).is_empty());
}

#[test]
fn exact_threshold_match_without_history_is_drift() {
    let registry = pipeline();
    let threshold = QuoteThreshold::resolve("P3", &registry);
    let mut drifting = deal("d-quote", 0, "P3");
    drifting.quote_phase_last_checked_at = Some(ts(60));

    let mut confirmed = deal("d-confirmed", 1, "P4");
    confirmed.quote_phase_last_checked_at = Some(ts(60));
    confirmed.quote_phase_first_started_at = Some(ts(30));

    let unchecked = deal("d-unchecked", 2, "P4");
    let deals = vec![drifting, confirmed, unchecked];

    let reconciliation = reconcile(&deals, &registry, &threshold);
    let drift_entry = reconciliation
        .entries()
        .iter()
        .find(|entry| entry.deal.id == "d-quote")
        .expect("drift deal present");
    assert!(drift_entry.is_quote);
    assert_eq!(drift_entry.history, Some(HistoryBucket::PhaseButNotHistory));

    assert_eq!(reconciliation.ids(DumpSelection::Drift), vec!["d-quote"]);
    assert_eq!(reconciliation.bucket_count(HistoryBucket::QuoteByHistory), 1);
    assert_eq!(reconciliation.bucket_count(HistoryBucket::Unknown), 1);

    let report = QuoteReport::build(
        &reconciliation,
        &registry,
        &threshold,
        &ReportConfig::default(),
    );
    assert_eq!(report.coverage.checked, 2);
    assert_eq!(report.coverage.drift, 1);
    assert_eq!(report.drift_samples[0].phase_name, "Quote");
    assert_eq!(report.drift_samples[0].phase_sort_order, Some(3));
}

#[test]
fn equal_rank_and_rank_precedence_hold_across_pipeline() {
    let rows: Vec<RawPhaseRecord> = serde_json::from_value(json!([
        {"id": "T", "sort_order": 5, "probability": 0.5},
        {"id": "same-rank", "sort_order": 5, "probability": 0.1},
        {"id": "earlier-but-likely", "sort_order": 4, "probability": 0.99},
    ]))
    .expect("phase rows");
    let registry = PhaseRegistry::from_records(&rows);
    let threshold = QuoteThreshold::resolve("T", &registry);

    assert!(classify("same-rank", &registry, &threshold));
    assert!(!classify("earlier-but-likely", &registry, &threshold));
}
