use crate::classifier::ClassificationRule;
use crate::reconciler::{HistoryBucket, Reconciliation};
use chrono::{DateTime, Utc};
use quotecheck_core::{Deal, PhaseRegistry, QuoteThreshold};
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_DEAL_URL_TEMPLATE: &str = "https://app.teamleader.eu/deals/{id}";
pub const DEFAULT_SAMPLE_LIMIT: usize = 20;
const ID_PLACEHOLDER: &str = "{id}";

/// Deep-link template; every `{id}` is replaced with the URL-escaped deal id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealUrlTemplate {
    template: String,
}

impl DealUrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, deal_id: &str) -> Option<String> {
        if deal_id.is_empty() || self.template.trim().is_empty() {
            return None;
        }
        Some(
            self.template
                .replace(ID_PLACEHOLDER, &urlencoding::encode(deal_id)),
        )
    }
}

impl Default for DealUrlTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_DEAL_URL_TEMPLATE)
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub sample_limit: usize,
    pub deal_url_template: Option<DealUrlTemplate>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            deal_url_template: Some(DealUrlTemplate::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleCount {
    pub rule: ClassificationRule,
    pub quote: usize,
    pub non_quote: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoverageCounts {
    pub checked: usize,
    pub unknown: usize,
    pub reached_quote_phase: usize,
    pub drift: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftSample {
    pub deal_id: String,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub phase_name: String,
    pub phase_sort_order: Option<u64>,
    pub title: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteReport {
    pub threshold: QuoteThreshold,
    pub total: usize,
    pub quote: usize,
    pub non_quote: usize,
    pub quote_statuses: Vec<StatusCount>,
    pub all_statuses: Vec<StatusCount>,
    pub coverage: CoverageCounts,
    pub rules: Vec<RuleCount>,
    pub drift_samples: Vec<DriftSample>,
}

impl QuoteReport {
    pub fn build(
        reconciliation: &Reconciliation<'_>,
        registry: &PhaseRegistry,
        threshold: &QuoteThreshold,
        config: &ReportConfig,
    ) -> Self {
        let total = reconciliation.total();
        let unknown = reconciliation.bucket_count(HistoryBucket::Unknown);
        let coverage = CoverageCounts {
            checked: total - unknown,
            unknown,
            reached_quote_phase: reconciliation.bucket_count(HistoryBucket::QuoteByHistory),
            drift: reconciliation.bucket_count(HistoryBucket::PhaseButNotHistory),
        };

        let drift_samples = reconciliation
            .drift()
            .take(config.sample_limit)
            .map(|entry| drift_sample(entry.deal, registry, config.deal_url_template.as_ref()))
            .collect();

        Self {
            threshold: threshold.clone(),
            total,
            quote: reconciliation.quote_count(),
            non_quote: reconciliation.non_quote_count(),
            quote_statuses: status_histogram(reconciliation.quote_deals()),
            all_statuses: status_histogram(reconciliation.entries().iter().map(|entry| entry.deal)),
            coverage,
            rules: rule_breakdown(reconciliation),
            drift_samples,
        }
    }

    /// Drift rows not shown because of the sample limit.
    pub fn drift_omitted(&self) -> usize {
        self.coverage.drift.saturating_sub(self.drift_samples.len())
    }
}

/// Counts deals per status key, most frequent first. Ties keep first-seen order.
pub fn status_histogram<'a, I>(deals: I) -> Vec<StatusCount>
where
    I: IntoIterator<Item = &'a Deal>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for deal in deals {
        let key = deal.status_key();
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    let mut histogram: Vec<StatusCount> = order
        .into_iter()
        .map(|status| {
            let count = counts.get(&status).copied().unwrap_or_default();
            StatusCount { status, count }
        })
        .collect();
    histogram.sort_by(|left, right| right.count.cmp(&left.count));
    histogram
}

fn rule_breakdown(reconciliation: &Reconciliation<'_>) -> Vec<RuleCount> {
    ClassificationRule::ALL
        .iter()
        .filter_map(|rule| {
            let (quote, non_quote) = reconciliation
                .entries()
                .iter()
                .filter(|entry| entry.rule == *rule)
                .fold((0, 0), |(quote, non_quote), entry| {
                    if entry.is_quote {
                        (quote + 1, non_quote)
                    } else {
                        (quote, non_quote + 1)
                    }
                });
            (quote + non_quote > 0).then_some(RuleCount {
                rule: *rule,
                quote,
                non_quote,
            })
        })
        .collect()
}

fn drift_sample(
    deal: &Deal,
    registry: &PhaseRegistry,
    template: Option<&DealUrlTemplate>,
) -> DriftSample {
    let phase_id = deal.phase_id.trim();
    let phase = registry.get(phase_id);
    DriftSample {
        deal_id: deal.id.clone(),
        created_at: deal.created_at,
        status: deal.status.clone(),
        phase_name: phase
            .map(|phase| phase.name.clone())
            .unwrap_or_else(|| phase_id.to_string()),
        phase_sort_order: phase.and_then(|phase| phase.sort_order),
        title: deal.title.trim().to_string(),
        url: template.and_then(|template| template.render(&deal.id)),
    }
}
