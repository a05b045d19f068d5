use crate::phase::PhaseRegistry;
use serde::Serialize;
use std::fmt;

/// The configured "quote from" phase, snapshotted against the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuoteThreshold {
    pub phase_id: String,
    pub name: Option<String>,
    pub sort_order: Option<u64>,
    pub probability: Option<f64>,
}

impl QuoteThreshold {
    /// No threshold configured: every deal counts as a quote.
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn resolve(phase_id: &str, registry: &PhaseRegistry) -> Self {
        let phase_id = phase_id.trim();
        if phase_id.is_empty() {
            return Self::unset();
        }
        match registry.get(phase_id) {
            Some(phase) => Self {
                phase_id: phase_id.to_string(),
                name: Some(phase.name.clone()),
                sort_order: phase.sort_order,
                probability: phase.probability,
            },
            None => Self {
                phase_id: phase_id.to_string(),
                ..Self::default()
            },
        }
    }

    pub fn is_unset(&self) -> bool {
        self.phase_id.is_empty()
    }

    pub fn is_known_phase(&self) -> bool {
        self.name.is_some()
    }
}

impl fmt::Display for QuoteThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unset() {
            return f.write_str("(none) -> all deals count as quote deals");
        }
        write!(
            f,
            "{} (id={}, sort_order={}, probability={})",
            self.name.as_deref().unwrap_or(&self.phase_id),
            self.phase_id,
            display_option(self.sort_order),
            display_option(self.probability),
        )
    }
}

fn display_option<T: fmt::Display>(value: Option<T>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
