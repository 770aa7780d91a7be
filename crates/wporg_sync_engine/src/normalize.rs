//! Per-record normalization.
//!
//! Every raw record goes through three stages:
//!
//! 1. Primary-key check: records without a usable key are dropped.
//! 2. Field rules from the endpoint's [`NormalizationRules`]: entity
//!    decoding, `false` → `null` on version-like fields, and the all-zero
//!    date sentinel → `null`.
//! 3. Schema coercion of every declared field.
//!
//! A failure in stages 2–3 does not drop the record: the original raw
//! record is passed through unchanged and flagged as degraded.

use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::{error, warn};
use wporg_protocol::{EndpointDescriptor, FieldType, NormalizationRules, Property, Record, Schema};

/// Date value the upstream API uses for "never".
pub const ZERO_DATE: &str = "0000-00-00 00:00:00";

/// Entity sequences decoded in text fields, in application order.
const ENTITIES: [(&str, &str); 2] = [("&#8211;", "\u{2013}"), ("&amp;", "&")];

/// Result of normalizing one raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// The cleaned, schema-conformant record.
    Record(Record),
    /// The record lacked a primary key and must not be emitted.
    Dropped {
        /// The missing key field.
        missing_key: String,
    },
    /// Normalization failed; `raw` is the untouched input.
    Degraded {
        /// The original record.
        raw: Record,
        /// What went wrong.
        reason: String,
    },
}

/// Record-level normalization failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub(crate) enum NormalizeError {
    /// An entity-decoded field held something other than text.
    #[error("field {field} is not text")]
    NotText {
        /// Field name.
        field: String,
    },

    /// A value could not be coerced to any declared type.
    #[error("field {field}: expected {expected}, found {found}")]
    Coercion {
        /// Field name.
        field: String,
        /// Declared types.
        expected: String,
        /// JSON type of the value.
        found: &'static str,
    },
}

/// Decodes the two entity sequences the upstream API leaves in text.
///
/// This is literal substring replacement, not general HTML decoding.
pub fn decode_entities(text: &str) -> String {
    ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (entity, decoded)| acc.replace(entity, decoded))
}

/// Normalizer for one endpoint.
#[derive(Debug, Clone)]
pub struct Normalizer<'a> {
    endpoint: &'a str,
    primary_keys: &'a [&'static str],
    rules: &'a NormalizationRules,
    schema: &'a Schema,
}

impl<'a> Normalizer<'a> {
    /// Creates the normalizer for `descriptor`.
    pub fn for_endpoint(descriptor: &'a EndpointDescriptor) -> Self {
        Self {
            endpoint: descriptor.name,
            primary_keys: &descriptor.primary_keys,
            rules: &descriptor.normalization,
            schema: &descriptor.schema,
        }
    }

    /// Normalizes one raw record.
    pub fn normalize(&self, raw: Record) -> Normalized {
        if let Some(missing) = self.missing_key(&raw) {
            warn!(
                endpoint = self.endpoint,
                key = missing,
                "skipping record missing primary key"
            );
            return Normalized::Dropped {
                missing_key: missing.to_string(),
            };
        }

        match self.apply(raw.clone()) {
            Ok(record) => Normalized::Record(record),
            Err(err) => {
                error!(
                    endpoint = self.endpoint,
                    key = %self.record_key(&raw),
                    error = %err,
                    "failed to normalize record, emitting it unchanged"
                );
                Normalized::Degraded {
                    raw,
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Returns the first primary key that is absent, null or empty.
    fn missing_key(&self, record: &Record) -> Option<&'static str> {
        self.primary_keys.iter().copied().find(|key| match record.get(*key) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        })
    }

    /// Renders the primary key for diagnostics.
    fn record_key(&self, record: &Record) -> String {
        let parts: Vec<String> = self
            .primary_keys
            .iter()
            .filter_map(|key| record.get(*key))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        if parts.is_empty() {
            "unknown".to_string()
        } else {
            parts.join("/")
        }
    }

    fn apply(&self, mut record: Record) -> Result<Record, NormalizeError> {
        for field in &self.rules.decode_entities {
            if let Some(value) = record.get_mut(*field) {
                match value {
                    Value::String(text) => *text = decode_entities(text),
                    v if is_blank(v) => {}
                    _ => {
                        return Err(NormalizeError::NotText {
                            field: field.to_string(),
                        })
                    }
                }
            }
        }

        for field in &self.rules.version_like {
            if let Some(value) = record.get_mut(*field) {
                if *value == Value::Bool(false) {
                    *value = Value::Null;
                }
            }
        }

        for field in &self.rules.zero_dates {
            if let Some(value) = record.get_mut(*field) {
                if value.as_str() == Some(ZERO_DATE) {
                    *value = Value::Null;
                }
            }
        }

        coerce_fields(record, self.schema.properties())
    }
}

/// Values the entity decoder skips rather than rejects.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(true) => false,
    }
}

fn coerce_fields(
    mut record: Map<String, Value>,
    properties: &[Property],
) -> Result<Map<String, Value>, NormalizeError> {
    for property in properties {
        if let Some(value) = record.get_mut(property.name) {
            let taken = std::mem::take(value);
            *value = coerce(taken, property)?;
        }
    }
    Ok(record)
}

fn coerce(value: Value, property: &Property) -> Result<Value, NormalizeError> {
    if value.is_null() || property.types.is_empty() {
        return Ok(value);
    }

    if property.types.iter().any(|t| t.matches(&value)) {
        return match (value, property.items) {
            (Value::Object(map), _) if !property.properties.is_empty() => {
                Ok(Value::Object(coerce_fields(map, &property.properties)?))
            }
            (Value::Array(items), Some(item_type)) => items
                .into_iter()
                .map(|item| coerce_scalar(item, &[item_type], property.name))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (other, _) => Ok(other),
        };
    }

    coerce_scalar(value, &property.types, property.name)
}

fn coerce_scalar(value: Value, types: &[FieldType], field: &str) -> Result<Value, NormalizeError> {
    if value.is_null() || types.iter().any(|t| t.matches(&value)) {
        return Ok(value);
    }
    types
        .iter()
        .find_map(|t| convert(&value, *t))
        .ok_or_else(|| NormalizeError::Coercion {
            field: field.to_string(),
            expected: types
                .iter()
                .map(FieldType::as_str)
                .collect::<Vec<_>>()
                .join("|"),
            found: json_type(&value),
        })
}

fn convert(value: &Value, target: FieldType) -> Option<Value> {
    match (target, value) {
        (FieldType::Integer, Value::Number(n)) => n
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::from(f as i64)),
        (FieldType::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        (FieldType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        (FieldType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
