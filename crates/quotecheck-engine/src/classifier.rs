use quotecheck_core::{PhaseRegistry, QuoteThreshold};
use serde::Serialize;
use std::fmt;

/// The rule that settled a classification, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationRule {
    NoThreshold,
    EmptyPhase,
    ExactMatch,
    UnknownPhase,
    SortOrder,
    Probability,
    InsufficientData,
}

impl ClassificationRule {
    pub const ALL: [ClassificationRule; 7] = [
        ClassificationRule::NoThreshold,
        ClassificationRule::EmptyPhase,
        ClassificationRule::ExactMatch,
        ClassificationRule::UnknownPhase,
        ClassificationRule::SortOrder,
        ClassificationRule::Probability,
        ClassificationRule::InsufficientData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationRule::NoThreshold => "no_threshold",
            ClassificationRule::EmptyPhase => "empty_phase",
            ClassificationRule::ExactMatch => "exact_match",
            ClassificationRule::UnknownPhase => "unknown_phase",
            ClassificationRule::SortOrder => "sort_order",
            ClassificationRule::Probability => "probability",
            ClassificationRule::InsufficientData => "insufficient_data",
        }
    }
}

impl fmt::Display for ClassificationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true when the deal currently sits at or after the threshold phase.
pub fn classify(deal_phase_id: &str, registry: &PhaseRegistry, threshold: &QuoteThreshold) -> bool {
    classify_with_rule(deal_phase_id, registry, threshold).0
}

/// Same as [`classify`], also naming the rule that decided.
///
/// Sort order is consulted before probability. Each comparison needs a value
/// on both the deal's phase and the threshold; with neither pair available
/// the deal is excluded.
pub fn classify_with_rule(
    deal_phase_id: &str,
    registry: &PhaseRegistry,
    threshold: &QuoteThreshold,
) -> (bool, ClassificationRule) {
    if threshold.is_unset() {
        return (true, ClassificationRule::NoThreshold);
    }

    let phase_id = deal_phase_id.trim();
    if phase_id.is_empty() {
        return (false, ClassificationRule::EmptyPhase);
    }

    if phase_id == threshold.phase_id {
        return (true, ClassificationRule::ExactMatch);
    }

    let Some(phase) = registry.get(phase_id) else {
        return (false, ClassificationRule::UnknownPhase);
    };

    if let (Some(deal_rank), Some(threshold_rank)) = (phase.sort_order, threshold.sort_order) {
        return (deal_rank >= threshold_rank, ClassificationRule::SortOrder);
    }

    if let (Some(deal_p), Some(threshold_p)) = (phase.probability, threshold.probability) {
        return (deal_p >= threshold_p, ClassificationRule::Probability);
    }

    (false, ClassificationRule::InsufficientData)
}
