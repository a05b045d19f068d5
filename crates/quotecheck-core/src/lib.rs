pub mod deal;
pub mod phase;
pub mod threshold;

pub use deal::{status_key, Deal, EMPTY_STATUS_KEY};
pub use phase::{
    normalize_probability, normalize_sort_order, Phase, PhaseRegistry, RawPhaseRecord,
};
pub use threshold::QuoteThreshold;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize a text field that may arrive as a string, a number or null.
/// Null and other shapes collapse to an empty string.
pub(crate) fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    Ok(match val {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}
