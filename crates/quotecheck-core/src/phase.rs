use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Raw phase row as delivered by the tenant's phase table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPhaseRecord {
    #[serde(default, deserialize_with = "crate::deserialize_lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "crate::deserialize_lenient_string")]
    pub name: String,
    #[serde(default)]
    pub sort_order: Value,
    #[serde(default)]
    pub probability: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub name: String,
    pub sort_order: Option<u64>,
    pub probability: Option<f64>,
}

impl Phase {
    /// Normalizes a raw record. Returns `None` when the id is blank.
    pub fn from_record(record: &RawPhaseRecord) -> Option<Self> {
        let id = record.id.trim();
        if id.is_empty() {
            return None;
        }
        let name = match record.name.trim() {
            "" => id.to_string(),
            name => name.to_string(),
        };
        Some(Self {
            id: id.to_string(),
            name,
            sort_order: normalize_sort_order(&record.sort_order),
            probability: normalize_probability(&record.probability),
        })
    }
}

/// Parses a pipeline rank. Integer-like strings and floats are truncated,
/// negatives clamp to 0, booleans and anything unparseable are unknown.
pub fn normalize_sort_order(value: &Value) -> Option<u64> {
    let raw = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i.max(0) as u64);
            }
            if let Some(u) = n.as_u64() {
                return Some(u);
            }
            n.as_f64()?
        }
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.trunc().max(0.0) as u64)
}

/// Parses a close probability into [0, 1]. Values above 1 are read as
/// percentages.
pub fn normalize_probability(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if raw.is_nan() {
        return None;
    }
    let scaled = if raw > 1.0 { raw / 100.0 } else { raw };
    Some(scaled.clamp(0.0, 1.0))
}

/// Known pipeline phases for one tenant, keyed by phase id.
#[derive(Debug, Clone, Default)]
pub struct PhaseRegistry {
    phases: HashMap<String, Phase>,
}

impl PhaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry from raw rows. Rows without an id are skipped and
    /// a repeated id overwrites the earlier row.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a RawPhaseRecord>,
    {
        let mut registry = Self::new();
        for record in records {
            if let Some(phase) = Phase::from_record(record) {
                registry.insert(phase);
            }
        }
        registry
    }

    pub fn insert(&mut self, phase: Phase) {
        self.phases.insert(phase.id.clone(), phase);
    }

    pub fn get(&self, phase_id: &str) -> Option<&Phase> {
        self.phases.get(phase_id)
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}
