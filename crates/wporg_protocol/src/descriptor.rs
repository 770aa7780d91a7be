//! Endpoint descriptors.
//!
//! An [`EndpointDescriptor`] is the static description of one REST source:
//! where it lives, how its records are keyed, how it pages, and which
//! cleanup rules apply to its records. Descriptors are built once by the
//! registry and only ever shared by reference afterwards.

use crate::schema::Schema;
use crate::selector::RecordSelector;
use crate::token::PageToken;
use serde_json::{json, Value};

/// How an endpoint splits its result set across responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `info.page` / `info.pages` in the body; the next page number is sent
    /// as `param`.
    PageNumber {
        /// Query parameter carrying the page number.
        param: &'static str,
    },
    /// Fixed-size pages addressed by item offset.
    OffsetCount {
        /// Query parameter carrying the offset.
        param: &'static str,
        /// Items per full page.
        page_size: u64,
    },
    /// A single response.
    None,
}

impl Pagination {
    /// Renders `token` as a query parameter for this strategy.
    ///
    /// Returns `None` for the first request, so the server default applies.
    pub fn token_param(&self, token: Option<PageToken>) -> Option<(&'static str, String)> {
        let token = token?;
        match self {
            Pagination::PageNumber { param } | Pagination::OffsetCount { param, .. } => {
                Some((*param, token.value().to_string()))
            }
            Pagination::None => None,
        }
    }
}

/// Whether the server returns records sorted by replication key, newest
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationOrder {
    /// Newest first: a stale record means every later record is stale too.
    Descending,
    /// No ordering guarantee: stale records are skipped but paging continues.
    Unordered,
}

/// How raw records are obtained from a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reshape {
    /// The selector yields record objects directly.
    Records,
    /// The body is a flat `{label: count}` map turned into share-of-total
    /// records.
    CountsMap,
}

/// Field cleanup rules for one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationRules {
    /// Text fields whose `&#8211;` / `&amp;` entities are decoded.
    pub decode_entities: Vec<&'static str>,
    /// Version-like fields where a boolean `false` means "not specified".
    pub version_like: Vec<&'static str>,
    /// Date fields where `0000-00-00 00:00:00` means "no date".
    pub zero_dates: Vec<&'static str>,
}

impl NormalizationRules {
    /// Rules that change nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns true if no field-level rule is configured.
    pub fn is_empty(&self) -> bool {
        self.decode_entities.is_empty() && self.version_like.is_empty() && self.zero_dates.is_empty()
    }
}

/// Static description of one endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    /// Endpoint (stream) name; also the key of its persisted watermark.
    pub name: &'static str,
    /// Path appended to the base URL.
    pub path: &'static str,
    /// Fields that identify a record.
    pub primary_keys: Vec<&'static str>,
    /// Field used for incremental sync.
    pub replication_key: Option<&'static str>,
    /// Server ordering of the replication key.
    pub ordering: ReplicationOrder,
    /// Where records live in a response body.
    pub record_selector: RecordSelector,
    /// Declared field types.
    pub schema: Schema,
    /// Paging strategy.
    pub pagination: Pagination,
    /// Fixed query parameters sent with every request.
    pub params: Vec<(&'static str, &'static str)>,
    /// Record cleanup rules.
    pub normalization: NormalizationRules,
    /// Record extraction mode.
    pub reshape: Reshape,
}

impl EndpointDescriptor {
    /// Creates a full-table, single-response descriptor.
    pub fn new(
        name: &'static str,
        path: &'static str,
        record_selector: RecordSelector,
        schema: Schema,
    ) -> Self {
        Self {
            name,
            path,
            primary_keys: Vec::new(),
            replication_key: None,
            ordering: ReplicationOrder::Unordered,
            record_selector,
            schema,
            pagination: Pagination::None,
            params: Vec::new(),
            normalization: NormalizationRules::none(),
            reshape: Reshape::Records,
        }
    }

    /// Sets the primary key fields.
    pub fn with_primary_keys(mut self, keys: &[&'static str]) -> Self {
        self.primary_keys = keys.to_vec();
        self
    }

    /// Makes the endpoint incremental on `key`.
    pub fn with_replication_key(mut self, key: &'static str, ordering: ReplicationOrder) -> Self {
        self.replication_key = Some(key);
        self.ordering = ordering;
        self
    }

    /// Sets the paging strategy.
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Adds a fixed query parameter.
    pub fn with_param(mut self, name: &'static str, value: &'static str) -> Self {
        self.params.push((name, value));
        self
    }

    /// Sets the record cleanup rules.
    pub fn with_normalization(mut self, rules: NormalizationRules) -> Self {
        self.normalization = rules;
        self
    }

    /// Sets the record extraction mode.
    pub fn with_reshape(mut self, reshape: Reshape) -> Self {
        self.reshape = reshape;
        self
    }

    /// Returns true if the endpoint syncs incrementally.
    pub fn is_incremental(&self) -> bool {
        self.replication_key.is_some()
    }

    /// Returns true if a stale record may end pagination early.
    pub fn early_stop_enabled(&self) -> bool {
        self.is_incremental() && self.ordering == ReplicationOrder::Descending
    }

    /// Builds the query parameters for a request at `token`.
    pub fn request_params(&self, token: Option<PageToken>) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if let Some((name, value)) = self.pagination.token_param(token) {
            params.push((name.to_string(), value));
        }
        params
    }

    /// Renders a catalog entry describing this endpoint.
    pub fn to_catalog_entry(&self) -> Value {
        json!({
            "stream": self.name,
            "tap_stream_id": self.name,
            "path": self.path,
            "key_properties": self.primary_keys,
            "replication_key": self.replication_key,
            "replication_method": if self.is_incremental() { "INCREMENTAL" } else { "FULL_TABLE" },
            "record_selector": self.record_selector.to_string(),
            "schema": self.schema.to_json_schema(),
        })
    }
}
