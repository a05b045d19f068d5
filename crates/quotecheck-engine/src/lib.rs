pub mod classifier;
pub mod reconciler;
pub mod report;

pub use classifier::{classify, classify_with_rule, ClassificationRule};
pub use reconciler::{
    history_bucket, reconcile, ClassifiedDeal, DumpSelection, HistoryBucket, Reconciliation,
};
pub use report::{
    status_histogram, CoverageCounts, DealUrlTemplate, DriftSample, QuoteReport, ReportConfig,
    RuleCount, StatusCount, DEFAULT_DEAL_URL_TEMPLATE, DEFAULT_SAMPLE_LIMIT,
};
