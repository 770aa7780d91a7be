//! Sync driver state machine.

use crate::aggregate::aggregate_body;
use crate::bookmark::{max_watermark, BookmarkFilter, PageState};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::normalize::{Normalized, Normalizer};
use crate::pagination::Paginator;
use crate::registry;
use crate::sink::RecordSink;
use crate::store::WatermarkStore;
use crate::transport::{FetchRequest, Transport};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use wporg_protocol::{EndpointDescriptor, PageToken, Record, Reshape, SyncRecord};

/// Phase of one endpoint run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Watermark loaded, nothing fetched yet.
    Start,
    /// A page request is in flight or being processed.
    Fetching,
    /// The paginator produced another token.
    MorePages,
    /// No more pages will be fetched.
    Done,
    /// The run is over and its watermark handled.
    Terminal,
}

impl SyncPhase {
    /// Returns true while the run can still fetch.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncPhase::Start | SyncPhase::Fetching | SyncPhase::MorePages
        )
    }
}

/// Statistics accumulated over every run of an engine.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Endpoint runs that reached TERMINAL successfully.
    pub runs_completed: u64,
    /// Endpoint runs that failed.
    pub runs_failed: u64,
    /// Total pages fetched.
    pub pages_fetched: u64,
    /// Total records handed to sinks.
    pub records_emitted: u64,
    /// Total records dropped for a missing primary key.
    pub records_dropped: u64,
    /// Total records emitted in degraded form.
    pub records_degraded: u64,
    /// Last completed run.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of one endpoint run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSyncResult {
    /// Endpoint name.
    pub endpoint: String,
    /// Pages fetched.
    pub pages: u64,
    /// Records handed to the sink.
    pub emitted: u64,
    /// Records dropped for a missing primary key.
    pub dropped: u64,
    /// Emitted records that bypassed normalization.
    pub degraded: u64,
    /// Records rejected as already synced.
    pub stale: u64,
    /// Whether pagination ended on a stale record.
    pub early_stop: bool,
    /// Watermark in effect when the run started.
    pub previous_watermark: Option<String>,
    /// Watermark after the run.
    pub watermark: Option<String>,
    /// Wall time of the run.
    pub duration: Duration,
}

impl EndpointSyncResult {
    fn new(endpoint: &str, previous_watermark: Option<String>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            pages: 0,
            emitted: 0,
            dropped: 0,
            degraded: 0,
            stale: 0,
            early_stop: false,
            watermark: previous_watermark.clone(),
            previous_watermark,
            duration: Duration::ZERO,
        }
    }

    /// Returns true if the run advanced the watermark.
    pub fn watermark_advanced(&self) -> bool {
        self.watermark != self.previous_watermark
    }
}

/// Outcome of [`SyncEngine::sync_all`], one entry per endpoint in order.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// `(endpoint, outcome)` pairs.
    pub results: Vec<(&'static str, SyncResult<EndpointSyncResult>)>,
}

impl SyncReport {
    /// Returns true if every endpoint succeeded.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|(_, r)| r.is_ok())
    }

    /// Returns the successful runs.
    pub fn succeeded(&self) -> impl Iterator<Item = &EndpointSyncResult> {
        self.results.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    /// Returns the failed endpoints and their errors.
    pub fn failed(&self) -> impl Iterator<Item = (&'static str, &SyncError)> {
        self.results
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (*name, e)))
    }

    /// Returns the outcome for `endpoint`.
    pub fn get(&self, endpoint: &str) -> Option<&SyncResult<EndpointSyncResult>> {
        self.results
            .iter()
            .find(|(name, _)| *name == endpoint)
            .map(|(_, r)| r)
    }
}

/// The sync engine extracts endpoints through a transport into a sink.
///
/// Each call to [`sync_endpoint`](Self::sync_endpoint) is one independent
/// run. The engine holds no per-run state, so one engine can drive several
/// endpoints from different threads.
pub struct SyncEngine<T: Transport, W: WatermarkStore> {
    config: SyncConfig,
    transport: Arc<T>,
    store: Arc<W>,
    phases: RwLock<HashMap<String, Vec<SyncPhase>>>,
    stats: RwLock<SyncStats>,
    cancelled: AtomicBool,
}

impl<T: Transport, W: WatermarkStore> SyncEngine<T, W> {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig, transport: T, store: W) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            store: Arc::new(store),
            phases: RwLock::new(HashMap::new()),
            stats: RwLock::new(SyncStats::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the watermark store.
    pub fn store(&self) -> &W {
        &self.store
    }

    /// Gets the current phase of `endpoint`'s latest run.
    pub fn phase(&self, endpoint: &str) -> Option<SyncPhase> {
        self.phases
            .read()
            .get(endpoint)
            .and_then(|history| history.last().copied())
    }

    /// Gets every phase `endpoint`'s latest run went through, in order.
    pub fn phase_history(&self, endpoint: &str) -> Vec<SyncPhase> {
        self.phases.read().get(endpoint).cloned().unwrap_or_default()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Cancels ongoing and future runs at their next fetch boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Resets the cancelled flag.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Returns true if a cancel is pending.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_phase(&self, endpoint: &str, phase: SyncPhase) {
        debug!(endpoint, phase = ?phase, "phase");
        let mut phases = self.phases.write();
        let history = phases.entry(endpoint.to_string()).or_default();
        if phase == SyncPhase::Start {
            history.clear();
        }
        history.push(phase);
    }

    /// Syncs every endpoint selected by the configuration, in registry
    /// order.
    ///
    /// A failing endpoint does not stop the others; its error is recorded
    /// in the report. Cancellation stops the remaining endpoints. Unknown
    /// allowlist entries fail the whole call before any fetch.
    pub fn sync_all(&self, sink: &mut dyn RecordSink) -> SyncResult<SyncReport> {
        let endpoints = registry::select(&self.config)?;
        let mut report = SyncReport::default();

        for descriptor in endpoints {
            let outcome = self.sync_endpoint(descriptor, sink);
            let cancelled = matches!(outcome, Err(SyncError::Cancelled));
            report.results.push((descriptor.name, outcome));
            if cancelled {
                break;
            }
        }

        Ok(report)
    }

    /// Runs one endpoint from START to TERMINAL.
    ///
    /// Records are written to `sink` as they are produced. The watermark is
    /// written once, at the end, and only if the run succeeded and admitted
    /// a newer replication value. On error, records already written stay
    /// written.
    pub fn sync_endpoint(
        &self,
        descriptor: &EndpointDescriptor,
        sink: &mut dyn RecordSink,
    ) -> SyncResult<EndpointSyncResult> {
        let start = Instant::now();
        let name = descriptor.name;
        self.set_phase(name, SyncPhase::Start);

        let outcome = self.run(descriptor, sink, start);
        if outcome.is_err() {
            self.set_phase(name, SyncPhase::Done);
        }
        self.set_phase(name, SyncPhase::Terminal);

        match outcome {
            Ok(result) => {
                info!(
                    endpoint = name,
                    pages = result.pages,
                    emitted = result.emitted,
                    dropped = result.dropped,
                    degraded = result.degraded,
                    stale = result.stale,
                    watermark = ?result.watermark,
                    "endpoint sync complete"
                );
                let mut stats = self.stats.write();
                stats.runs_completed += 1;
                stats.pages_fetched += result.pages;
                stats.records_emitted += result.emitted;
                stats.records_dropped += result.dropped;
                stats.records_degraded += result.degraded;
                stats.last_sync_time = Some(Instant::now());
                Ok(result)
            }
            Err(err) => {
                error!(endpoint = name, error = %err, "endpoint sync failed");
                let mut stats = self.stats.write();
                stats.runs_failed += 1;
                stats.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn run(
        &self,
        descriptor: &EndpointDescriptor,
        sink: &mut dyn RecordSink,
        start: Instant,
    ) -> SyncResult<EndpointSyncResult> {
        let name = descriptor.name;

        // START
        let persisted = if descriptor.is_incremental() {
            self.store.get(name)?
        } else {
            None
        };
        let effective = if descriptor.is_incremental() {
            persisted.clone().or_else(|| self.config.start_date.clone())
        } else {
            None
        };
        info!(endpoint = name, watermark = ?effective, "starting endpoint sync");

        let filter = BookmarkFilter::new(descriptor, effective.as_deref());
        let normalizer = Normalizer::for_endpoint(descriptor);
        let paginator = Paginator::for_endpoint(descriptor);
        let mut page = PageState::new();
        let mut result = EndpointSyncResult::new(name, persisted.clone());
        let mut max_seen: Option<String> = None;

        sink.begin(descriptor)?;

        loop {
            self.check_cancelled()?;
            self.set_phase(name, SyncPhase::Fetching);

            let body = self.fetch_page(descriptor, page.token)?;
            page.pages_fetched += 1;

            for raw in self.extract(descriptor, &body, &mut result)? {
                let (record, degraded) = match normalizer.normalize(raw) {
                    Normalized::Record(record) => (record, None),
                    Normalized::Dropped { .. } => {
                        result.dropped += 1;
                        continue;
                    }
                    Normalized::Degraded { raw, reason } => (raw, Some(reason)),
                };

                let Some(record) = filter.admit(record, &mut page) else {
                    result.stale += 1;
                    continue;
                };

                if let Some(key) = descriptor.replication_key {
                    max_seen = max_watermark(max_seen, record.get(key).and_then(Value::as_str));
                }

                let out = match degraded {
                    Some(reason) => {
                        result.degraded += 1;
                        SyncRecord::degraded(name, record, reason)
                    }
                    None => SyncRecord::normalized(name, record),
                };
                sink.write(out)?;
                result.emitted += 1;
            }

            if page.should_stop_now() {
                result.early_stop = true;
                break;
            }

            match paginator.next(&body, page.token) {
                Some(next) => {
                    self.set_phase(name, SyncPhase::MorePages);
                    page.token = Some(next);
                }
                None => break,
            }
        }

        self.set_phase(name, SyncPhase::Done);
        result.pages = page.pages_fetched;

        // TERMINAL
        let next = max_watermark(persisted.clone(), max_seen.as_deref());
        if next != persisted {
            if let Some(value) = &next {
                self.store.set(name, value)?;
                debug!(endpoint = name, watermark = %value, "watermark persisted");
            }
        }
        result.watermark = next;
        result.duration = start.elapsed();
        Ok(result)
    }

    /// Performs one request and decodes its JSON body.
    fn fetch_page(
        &self,
        descriptor: &EndpointDescriptor,
        token: Option<PageToken>,
    ) -> SyncResult<Value> {
        if !self.config.request_delay.is_zero() {
            std::thread::sleep(self.config.request_delay);
        }

        let mut request = FetchRequest::new(self.config.base_url.as_str(), descriptor.path);
        for (k, v) in descriptor.request_params(token) {
            request = request.with_query(k, v);
        }
        for (k, v) in self.config.params_for(descriptor.name) {
            request = request.with_query(k.as_str(), v.as_str());
        }
        if let Some(agent) = &self.config.user_agent {
            request = request.with_header("User-Agent", agent.as_str());
        }

        debug!(endpoint = descriptor.name, page = ?token, "fetching");
        let response = self.transport.fetch(&request)?;
        if !response.is_success() {
            return Err(SyncError::HttpStatus {
                status: response.status,
                url: request.endpoint_url(),
            });
        }

        Ok(serde_json::from_slice(&response.body)?)
    }

    /// Pulls raw records out of a decoded body.
    fn extract(
        &self,
        descriptor: &EndpointDescriptor,
        body: &Value,
        result: &mut EndpointSyncResult,
    ) -> SyncResult<Vec<Record>> {
        match descriptor.reshape {
            Reshape::CountsMap => {
                let label = descriptor.primary_keys.first().copied().unwrap_or("label");
                aggregate_body(label, body)
            }
            Reshape::Records => {
                let mut records = Vec::new();
                for item in descriptor.record_selector.select(body) {
                    match item {
                        Value::Object(map) => records.push(map.clone()),
                        other => {
                            warn!(
                                endpoint = descriptor.name,
                                item = %other,
                                "skipping non-object record"
                            );
                            result.dropped += 1;
                        }
                    }
                }
                Ok(records)
            }
        }
    }
}
