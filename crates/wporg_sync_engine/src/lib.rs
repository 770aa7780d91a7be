//! # wporg Sync Engine
//!
//! Paginated, incremental extraction from the WordPress.org public API.
//!
//! This crate provides:
//! - The endpoint registry (plugins, themes, events, patterns, usage stats)
//! - Paginators for page-number and offset-count APIs
//! - Watermark-based bookmark filtering with early stop
//! - Record normalization with lenient degradation
//! - Share-of-total aggregation for the stats endpoints
//! - The sync driver state machine
//! - Transport, watermark-store and sink abstractions with in-memory doubles
//!
//! ## Architecture
//!
//! Every endpoint run is a small state machine:
//! 1. Load the watermark
//! 2. Fetch a page, normalize its records, filter them against the watermark
//! 3. Ask the paginator for the next page, or stop
//! 4. Persist the new watermark once, at the end
//!
//! The engine never opens a socket itself: a [`Transport`] does the
//! fetching, a [`WatermarkStore`] keeps bookmarks and a [`RecordSink`]
//! receives the output.
//!
//! ## Key Invariants
//!
//! - Emitted records on incremental endpoints are strictly newer than the
//!   watermark the run started with
//! - Emitted records always carry their primary key
//! - The watermark is written at most once per run, and never by a failed run
//! - Pagination always terminates

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod aggregate;
mod bookmark;
mod config;
mod error;
mod http;
mod normalize;
mod pagination;
pub mod registry;
mod sink;
mod state;
mod store;
mod transport;

pub use aggregate::{aggregate, aggregate_body, COUNT_FIELD, PERCENT_FIELD};
pub use bookmark::{max_watermark, BookmarkFilter, PageState};
pub use config::{SyncConfig, DEFAULT_BASE_URL, DEFAULT_REQUEST_DELAY};
pub use error::{SyncError, SyncResult};
pub use http::{build_url, HttpClient, HttpTransport};
pub use normalize::{decode_entities, Normalized, Normalizer, ZERO_DATE};
pub use pagination::Paginator;
pub use sink::{MemorySink, RecordSink};
pub use state::{EndpointSyncResult, SyncEngine, SyncPhase, SyncReport, SyncStats};
pub use store::{MemoryWatermarkStore, WatermarkStore};
pub use transport::{FetchRequest, FetchResponse, MockTransport, Transport};
