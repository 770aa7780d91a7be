//! Records handed to output sinks.

use serde::Serialize;
use serde_json::{Map, Value};

/// A record body: field name to JSON value.
pub type Record = Map<String, Value>;

/// A record tagged with the endpoint it came from.
///
/// `degraded` is set when normalization failed and the record is the raw,
/// unmodified upstream value. Such records may not match the declared
/// schema; consumers that need strict typing should check it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncRecord {
    /// Endpoint name.
    pub endpoint: String,
    /// Record fields.
    pub data: Record,
    /// Why normalization was skipped, for degraded records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl SyncRecord {
    /// Creates a normalized record.
    pub fn normalized(endpoint: impl Into<String>, data: Record) -> Self {
        Self {
            endpoint: endpoint.into(),
            data,
            degraded: None,
        }
    }

    /// Creates a degraded (raw passthrough) record.
    pub fn degraded(endpoint: impl Into<String>, data: Record, reason: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            data,
            degraded: Some(reason.into()),
        }
    }

    /// Returns true if this record bypassed normalization.
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    /// Returns the value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}
