use crate::classifier::{classify_with_rule, ClassificationRule};
use quotecheck_core::{Deal, PhaseRegistry, QuoteThreshold};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Where a deal lands when its phase classification is checked against the
/// history scan markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryBucket {
    /// The history scan has not processed the deal yet.
    Unknown,
    /// The scan observed the deal entering the quote phase.
    QuoteByHistory,
    /// Currently at/after the threshold, but the scan never saw it enter.
    PhaseButNotHistory,
}

pub fn history_bucket(deal: &Deal, is_quote: bool) -> Option<HistoryBucket> {
    if !deal.history_checked() {
        Some(HistoryBucket::Unknown)
    } else if deal.reached_quote_phase() {
        Some(HistoryBucket::QuoteByHistory)
    } else if is_quote {
        Some(HistoryBucket::PhaseButNotHistory)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifiedDeal<'a> {
    pub deal: &'a Deal,
    pub is_quote: bool,
    pub rule: ClassificationRule,
    pub history: Option<HistoryBucket>,
}

impl ClassifiedDeal<'_> {
    pub fn is_drift(&self) -> bool {
        self.history == Some(HistoryBucket::PhaseButNotHistory)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DumpSelection {
    All,
    Quote,
    NonQuote,
    Drift,
}

impl DumpSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            DumpSelection::All => "all",
            DumpSelection::Quote => "quote",
            DumpSelection::NonQuote => "non-quote",
            DumpSelection::Drift => "drift",
        }
    }

    fn includes(&self, entry: &ClassifiedDeal<'_>) -> bool {
        match self {
            DumpSelection::All => true,
            DumpSelection::Quote => entry.is_quote,
            DumpSelection::NonQuote => !entry.is_quote,
            DumpSelection::Drift => entry.is_drift(),
        }
    }
}

impl fmt::Display for DumpSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DumpSelection {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "all" | "all_ids" => Ok(DumpSelection::All),
            "quote" | "quote_ids" => Ok(DumpSelection::Quote),
            "non-quote" | "non_quote" | "non_quote_ids" => Ok(DumpSelection::NonQuote),
            "drift" | "inconsistent" | "inconsistent_ids" => Ok(DumpSelection::Drift),
            other => Err(format!("Unknown dump selection: {other}")),
        }
    }
}

/// Per-deal classification and history bucket for one batch, in batch order.
#[derive(Debug, Clone)]
pub struct Reconciliation<'a> {
    entries: Vec<ClassifiedDeal<'a>>,
}

impl<'a> Reconciliation<'a> {
    pub fn entries(&self) -> &[ClassifiedDeal<'a>] {
        &self.entries
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn quote_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_quote).count()
    }

    pub fn non_quote_count(&self) -> usize {
        self.total() - self.quote_count()
    }

    pub fn quote_deals(&self) -> impl Iterator<Item = &'a Deal> + '_ {
        self.entries
            .iter()
            .filter(|entry| entry.is_quote)
            .map(|entry| entry.deal)
    }

    pub fn bucket(&self, bucket: HistoryBucket) -> impl Iterator<Item = &ClassifiedDeal<'a>> + '_ {
        self.entries
            .iter()
            .filter(move |entry| entry.history == Some(bucket))
    }

    pub fn bucket_count(&self, bucket: HistoryBucket) -> usize {
        self.bucket(bucket).count()
    }

    pub fn drift(&self) -> impl Iterator<Item = &ClassifiedDeal<'a>> + '_ {
        self.bucket(HistoryBucket::PhaseButNotHistory)
    }

    /// Deal ids of the selected set, in batch order. Blank ids are skipped.
    pub fn ids(&self, selection: DumpSelection) -> Vec<&'a str> {
        self.entries
            .iter()
            .filter(|entry| selection.includes(entry))
            .map(|entry| entry.deal.id.as_str())
            .filter(|id| !id.is_empty())
            .collect()
    }
}

pub fn reconcile<'a>(
    deals: &'a [Deal],
    registry: &PhaseRegistry,
    threshold: &QuoteThreshold,
) -> Reconciliation<'a> {
    let entries = deals
        .iter()
        .map(|deal| {
            let (is_quote, rule) = classify_with_rule(&deal.phase_id, registry, threshold);
            let history = history_bucket(deal, is_quote);
            if history == Some(HistoryBucket::PhaseButNotHistory) {
                debug!(
                    event = "phase_history_drift",
                    deal_id = %deal.id,
                    phase_id = %deal.phase_id,
                    rule = %rule
                );
            }
            ClassifiedDeal {
                deal,
                is_quote,
                rule,
                history,
            }
        })
        .collect();
    Reconciliation { entries }
}
