//! Singer-style JSON-lines output.
//!
//! Each endpoint's records are preceded by one `SCHEMA` message; the run
//! ends with a `STATE` message carrying the bookmarks.

use serde_json::{json, Value};
use std::collections::HashSet;
use std::io::Write;
use wporg_protocol::{EndpointDescriptor, SyncRecord};
use wporg_sync_engine::{RecordSink, SyncError, SyncResult};

/// Writes messages, one JSON object per line.
pub struct SingerWriter<W: Write> {
    out: W,
    announced: HashSet<&'static str>,
}

impl<W: Write> SingerWriter<W> {
    /// Creates a writer over `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            announced: HashSet::new(),
        }
    }

    /// Writes the final `STATE` message.
    pub fn write_state(&mut self, state: Value) -> SyncResult<()> {
        self.emit(&json!({"type": "STATE", "value": state}))?;
        self.out.flush().map_err(|e| SyncError::Sink(e.to_string()))
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, message: &Value) -> SyncResult<()> {
        serde_json::to_writer(&mut self.out, message).map_err(|e| SyncError::Sink(e.to_string()))?;
        self.out
            .write_all(b"\n")
            .map_err(|e| SyncError::Sink(e.to_string()))
    }
}

impl<W: Write> RecordSink for SingerWriter<W> {
    fn begin(&mut self, endpoint: &EndpointDescriptor) -> SyncResult<()> {
        if !self.announced.insert(endpoint.name) {
            return Ok(());
        }
        let bookmark_properties: Vec<&str> = endpoint.replication_key.into_iter().collect();
        self.emit(&json!({
            "type": "SCHEMA",
            "stream": endpoint.name,
            "schema": endpoint.schema.to_json_schema(),
            "key_properties": endpoint.primary_keys,
            "bookmark_properties": bookmark_properties,
        }))
    }

    fn write(&mut self, record: SyncRecord) -> SyncResult<()> {
        let mut message = json!({
            "type": "RECORD",
            "stream": record.endpoint,
            "record": record.data,
        });
        if let (Some(reason), Some(fields)) = (record.degraded, message.as_object_mut()) {
            fields.insert("degraded".to_string(), Value::String(reason));
        }
        self.emit(&message)
    }
}
