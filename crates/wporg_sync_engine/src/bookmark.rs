//! Incremental bookmark filtering.
//!
//! Records are compared to the watermark by plain string ordering on the
//! replication value, which matches the upstream ISO-8601-like timestamps.
//! On descending-ordered endpoints the first stale record ends pagination:
//! every record after it is at least as old.

use serde_json::Value;
use tracing::info;
use wporg_protocol::{EndpointDescriptor, PageToken, Record};

/// Paging state of one sync run.
///
/// Owned by a single `sync_endpoint` call and dropped with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageState {
    /// Token of the page being fetched; `None` is the first page.
    pub token: Option<PageToken>,
    /// Pages fetched so far.
    pub pages_fetched: u64,
    stop: bool,
}

impl PageState {
    /// Creates state for a fresh run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once a stale record has ended pagination.
    pub fn should_stop_now(&self) -> bool {
        self.stop
    }

    /// Sets the stop flag. Returns true only the first time.
    pub fn request_stop(&mut self) -> bool {
        !std::mem::replace(&mut self.stop, true)
    }
}

/// Watermark comparison for one endpoint.
#[derive(Debug, Clone)]
pub struct BookmarkFilter<'a> {
    endpoint: &'a str,
    replication_key: Option<&'a str>,
    watermark: Option<&'a str>,
    early_stop: bool,
}

impl<'a> BookmarkFilter<'a> {
    /// Creates a filter for `descriptor` against `watermark`.
    pub fn new(descriptor: &'a EndpointDescriptor, watermark: Option<&'a str>) -> Self {
        Self {
            endpoint: descriptor.name,
            replication_key: descriptor.replication_key,
            watermark,
            early_stop: descriptor.early_stop_enabled(),
        }
    }

    /// Returns the watermark in effect.
    pub fn watermark(&self) -> Option<&'a str> {
        self.watermark
    }

    /// Returns true if every record passes unchecked.
    pub fn is_passthrough(&self) -> bool {
        self.replication_key.is_none() || self.watermark.is_none()
    }

    /// Returns `record` if it is newer than the watermark.
    ///
    /// A record at or below the watermark is rejected and, on descending
    /// endpoints, sets the stop flag of `page`. A record without a usable
    /// replication value is rejected without stopping: it cannot be shown to
    /// be newer, and says nothing about the records after it.
    pub fn admit(&self, record: Record, page: &mut PageState) -> Option<Record> {
        let (Some(key), Some(watermark)) = (self.replication_key, self.watermark) else {
            return Some(record);
        };

        match record.get(key) {
            Some(Value::String(value)) if value.as_str() > watermark => Some(record),
            Some(Value::String(value)) => {
                if self.early_stop && page.request_stop() {
                    info!(
                        endpoint = self.endpoint,
                        value = %value,
                        watermark,
                        "reached already-synced records, stopping pagination"
                    );
                }
                None
            }
            _ => None,
        }
    }
}

/// Returns the greater of two optional replication values.
pub fn max_watermark(current: Option<String>, candidate: Option<&str>) -> Option<String> {
    match (current, candidate) {
        (Some(c), Some(v)) if v > c.as_str() => Some(v.to_string()),
        (None, Some(v)) => Some(v.to_string()),
        (current, _) => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wporg_protocol::{RecordSelector, ReplicationOrder, Schema};

    const WATERMARK: &str = "2024-06-01T12:00:00Z";

    fn incremental(order: ReplicationOrder) -> EndpointDescriptor {
        EndpointDescriptor::new(
            "plugins",
            "/plugins/info/1.2/",
            RecordSelector::items_of("plugins"),
            Schema::default(),
        )
        .with_primary_keys(&["slug"])
        .with_replication_key("last_updated", order)
    }

    fn record(slug: &str, updated: Value) -> Record {
        let mut r = Record::new();
        r.insert("slug".into(), json!(slug));
        r.insert("last_updated".into(), updated);
        r
    }

    #[test]
    fn no_watermark_admits_everything() {
        let d = incremental(ReplicationOrder::Descending);
        let filter = BookmarkFilter::new(&d, None);
        let mut page = PageState::new();

        assert!(filter.is_passthrough());
        assert!(filter
            .admit(record("a", json!("1999-01-01")), &mut page)
            .is_some());
        assert!(!page.should_stop_now());
    }

    #[test]
    fn full_table_endpoint_ignores_watermark() {
        let d = EndpointDescriptor::new(
            "events",
            "/events/1.0/",
            RecordSelector::items_of("events"),
            Schema::default(),
        );
        let filter = BookmarkFilter::new(&d, Some(WATERMARK));
        let mut page = PageState::new();
        assert!(filter.admit(record("a", json!("2000")), &mut page).is_some());
    }

    #[test]
    fn descending_page_admits_newer_and_stops_on_first_stale() {
        let d = incremental(ReplicationOrder::Descending);
        let filter = BookmarkFilter::new(&d, Some(WATERMARK));
        let mut page = PageState::new();

        let values = [
            "2024-06-03T00:00:00Z",
            "2024-06-01T12:00:01Z",
            "2024-06-01T12:00:00Z",
            "2024-05-30T00:00:00Z",
        ];
        let mut admitted = Vec::new();
        for (i, v) in values.iter().enumerate() {
            let stopped_before = page.should_stop_now();
            if filter.admit(record(&i.to_string(), json!(v)), &mut page).is_some() {
                admitted.push(*v);
            }
            if i == 2 {
                assert!(!stopped_before);
                assert!(page.should_stop_now());
            }
        }

        assert_eq!(admitted, vec!["2024-06-03T00:00:00Z", "2024-06-01T12:00:01Z"]);
        assert!(page.should_stop_now());
    }

    #[test]
    fn unordered_endpoint_never_stops() {
        let d = incremental(ReplicationOrder::Unordered);
        let filter = BookmarkFilter::new(&d, Some(WATERMARK));
        let mut page = PageState::new();

        assert!(filter.admit(record("old", json!("2020-01-01")), &mut page).is_none());
        assert!(!page.should_stop_now());
        assert!(filter
            .admit(record("new", json!("2025-01-01")), &mut page)
            .is_some());
    }

    #[test]
    fn missing_replication_value_rejected_without_stopping() {
        let d = incremental(ReplicationOrder::Descending);
        let filter = BookmarkFilter::new(&d, Some(WATERMARK));
        let mut page = PageState::new();

        assert!(filter.admit(record("null", Value::Null), &mut page).is_none());
        assert!(filter.admit(record("num", json!(20240602)), &mut page).is_none());
        let mut bare = Record::new();
        bare.insert("slug".into(), json!("bare"));
        assert!(filter.admit(bare, &mut page).is_none());
        assert!(!page.should_stop_now());
    }

    #[test]
    fn stop_flag_is_one_shot() {
        let mut page = PageState::new();
        assert!(page.request_stop());
        assert!(!page.request_stop());
        assert!(page.should_stop_now());
    }

    #[test]
    fn watermark_max() {
        assert_eq!(max_watermark(None, None), None);
        assert_eq!(max_watermark(None, Some("b")).as_deref(), Some("b"));
        assert_eq!(max_watermark(Some("b".into()), Some("a")).as_deref(), Some("b"));
        assert_eq!(max_watermark(Some("b".into()), Some("c")).as_deref(), Some("c"));
        assert_eq!(max_watermark(Some("b".into()), None).as_deref(), Some("b"));
    }
}
