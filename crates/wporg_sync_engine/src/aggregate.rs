//! Share-of-total aggregation for the statistics endpoints.
//!
//! The stats endpoints answer with a flat `{label: count}` object. Each
//! entry becomes one record carrying the label, the integer count and the
//! entry's percentage of the summed counts.

use crate::error::{SyncError, SyncResult};
use serde_json::{Map, Value};
use wporg_protocol::Record;

/// Field holding the integer count.
pub const COUNT_FIELD: &str = "count";

/// Field holding the share of the total, in percent.
pub const PERCENT_FIELD: &str = "percent";

/// Converts a counts map into records, in map order.
///
/// The label is stored under `label_key`. A zero total yields zero
/// percentages. Counts must be non-negative integers; integer strings and
/// integral floats are accepted, anything else makes the body malformed.
pub fn aggregate(label_key: &str, counts: &Map<String, Value>) -> SyncResult<Vec<Record>> {
    let parsed = counts
        .iter()
        .map(|(label, value)| parse_count(label, value).map(|count| (label, count)))
        .collect::<SyncResult<Vec<_>>>()?;

    let total: u128 = parsed.iter().map(|(_, count)| u128::from(*count)).sum();

    Ok(parsed
        .into_iter()
        .map(|(label, count)| {
            let percent = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            };
            let mut record = Record::new();
            record.insert(label_key.to_string(), Value::String(label.clone()));
            record.insert(COUNT_FIELD.to_string(), Value::from(count));
            record.insert(PERCENT_FIELD.to_string(), Value::from(percent));
            record
        })
        .collect())
}

/// Aggregates a whole response body, which must be a JSON object.
pub fn aggregate_body(label_key: &str, body: &Value) -> SyncResult<Vec<Record>> {
    match body {
        Value::Object(counts) => aggregate(label_key, counts),
        other => Err(SyncError::MalformedBody(format!(
            "expected a counts object, found {}",
            kind(other)
        ))),
    }
}

fn parse_count(label: &str, value: &Value) -> SyncResult<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && *f < u64::MAX as f64)
                .map(|f| f.trunc() as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| SyncError::MalformedBody(format!("invalid count for {label}: {value}")))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
