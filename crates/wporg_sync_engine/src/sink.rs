//! Record output.

use crate::error::SyncResult;
use wporg_protocol::{EndpointDescriptor, SyncRecord};

/// Receives the records of a sync run, in emission order.
///
/// A sink error ends the current endpoint run like a fetch failure: the
/// watermark is not advanced.
pub trait RecordSink {
    /// Called once before the first record of each endpoint run.
    fn begin(&mut self, _endpoint: &EndpointDescriptor) -> SyncResult<()> {
        Ok(())
    }

    /// Writes one record.
    fn write(&mut self, record: SyncRecord) -> SyncResult<()>;
}

impl RecordSink for Vec<SyncRecord> {
    fn write(&mut self, record: SyncRecord) -> SyncResult<()> {
        self.push(record);
        Ok(())
    }
}

/// A sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<SyncRecord>,
    runs: Vec<String>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every record written so far.
    pub fn records(&self) -> &[SyncRecord] {
        &self.records
    }

    /// Returns the records written for `endpoint`.
    pub fn records_for<'a>(&'a self, endpoint: &'a str) -> impl Iterator<Item = &'a SyncRecord> + 'a {
        self.records.iter().filter(move |r| r.endpoint == endpoint)
    }

    /// Returns the endpoint names whose runs began, in order.
    pub fn runs(&self) -> &[String] {
        &self.runs
    }

    /// Consumes the sink, returning its records.
    pub fn into_records(self) -> Vec<SyncRecord> {
        self.records
    }
}

impl RecordSink for MemorySink {
    fn begin(&mut self, endpoint: &EndpointDescriptor) -> SyncResult<()> {
        self.runs.push(endpoint.name.to_string());
        Ok(())
    }

    fn write(&mut self, record: SyncRecord) -> SyncResult<()> {
        self.records.push(record);
        Ok(())
    }
}
