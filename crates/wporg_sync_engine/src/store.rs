//! Watermark persistence.

use crate::error::SyncResult;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Stores one watermark string per endpoint name.
///
/// The engine reads an endpoint's watermark once when its run starts and
/// writes it at most once, when the run ends successfully. Distinct
/// endpoints may be synced concurrently against the same store.
pub trait WatermarkStore: Send + Sync {
    /// Returns the persisted watermark for `endpoint`.
    fn get(&self, endpoint: &str) -> SyncResult<Option<String>>;

    /// Persists `value` as the watermark for `endpoint`.
    fn set(&self, endpoint: &str, value: &str) -> SyncResult<()>;
}

/// An in-memory watermark store.
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    values: RwLock<HashMap<String, String>>,
    writes: RwLock<u64>,
}

impl MemoryWatermarkStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `endpoint → value` pairs.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        store
            .values
            .write()
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
        store
    }

    /// Returns the number of `set` calls so far.
    pub fn writes(&self) -> u64 {
        *self.writes.read()
    }

    /// Returns a copy of every stored watermark.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.values.read().clone()
    }
}

impl WatermarkStore for MemoryWatermarkStore {
    fn get(&self, endpoint: &str) -> SyncResult<Option<String>> {
        Ok(self.values.read().get(endpoint).cloned())
    }

    fn set(&self, endpoint: &str, value: &str) -> SyncResult<()> {
        self.values
            .write()
            .insert(endpoint.to_string(), value.to_string());
        *self.writes.write() += 1;
        Ok(())
    }
}
