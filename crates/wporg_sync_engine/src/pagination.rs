//! Next-page decisions.
//!
//! A [`Paginator`] looks at a decoded response and the token that produced
//! it and decides whether another request is needed. Ambiguous server
//! metadata always resolves to "stop": a paginator must never be able to
//! loop forever.

use serde_json::Value;
use tracing::{debug, warn};
use wporg_protocol::{EndpointDescriptor, PageToken, Pagination, RecordSelector};

/// Per-endpoint paging logic.
#[derive(Debug, Clone)]
pub struct Paginator<'a> {
    endpoint: &'a str,
    strategy: Pagination,
    selector: &'a RecordSelector,
}

impl<'a> Paginator<'a> {
    /// Creates a paginator for `descriptor`.
    pub fn for_endpoint(descriptor: &'a EndpointDescriptor) -> Self {
        Self {
            endpoint: descriptor.name,
            strategy: descriptor.pagination,
            selector: &descriptor.record_selector,
        }
    }

    /// Returns the token for the page after `previous`, or `None` when the
    /// result set is exhausted.
    pub fn next(&self, body: &Value, previous: Option<PageToken>) -> Option<PageToken> {
        match self.strategy {
            Pagination::PageNumber { .. } => self.next_page_number(body, previous),
            Pagination::OffsetCount { page_size, .. } => {
                self.next_offset(body, previous, page_size)
            }
            Pagination::None => None,
        }
    }

    fn next_page_number(&self, body: &Value, previous: Option<PageToken>) -> Option<PageToken> {
        let Some(info) = body.get("info").and_then(Value::as_object) else {
            warn!(endpoint = self.endpoint, "response has no info block, stopping pagination");
            return None;
        };

        let requested = match previous {
            Some(PageToken::Page(n)) => Some(n),
            _ => None,
        };

        let current = match info.get("page") {
            None => requested.unwrap_or(1),
            Some(value) => match as_count(value) {
                Some(n) => n,
                None => {
                    warn!(endpoint = self.endpoint, page = %value, "malformed info.page, stopping pagination");
                    return None;
                }
            },
        };

        let total = match info.get("pages") {
            None => {
                warn!(endpoint = self.endpoint, "info has no page count, stopping pagination");
                return None;
            }
            Some(value) => match as_count(value) {
                Some(n) => n,
                None => {
                    warn!(endpoint = self.endpoint, pages = %value, "malformed info.pages, stopping pagination");
                    return None;
                }
            },
        };

        if current >= total {
            debug!(endpoint = self.endpoint, current, total, "last page reached");
            return None;
        }

        let next = current + 1;
        if requested.is_some_and(|r| next <= r) {
            warn!(
                endpoint = self.endpoint,
                requested = ?requested,
                reported = current,
                "server reported an earlier page than requested, stopping pagination"
            );
            return None;
        }

        Some(PageToken::Page(next))
    }

    fn next_offset(
        &self,
        body: &Value,
        previous: Option<PageToken>,
        page_size: u64,
    ) -> Option<PageToken> {
        let returned = self.selector.select(body).len() as u64;
        if page_size == 0 || returned != page_size {
            debug!(endpoint = self.endpoint, returned, page_size, "short page, stopping pagination");
            return None;
        }

        let offset = match previous {
            Some(PageToken::Offset(n)) => n,
            _ => 0,
        };
        Some(PageToken::Offset(offset + page_size))
    }
}

/// Reads a non-negative integer, accepting numeric strings.
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use wporg_protocol::Schema;

    fn descriptor(pagination: Pagination) -> EndpointDescriptor {
        EndpointDescriptor::new(
            "test",
            "/test/",
            RecordSelector::items_of("items"),
            Schema::default(),
        )
        .with_pagination(pagination)
    }

    fn page_number() -> EndpointDescriptor {
        descriptor(Pagination::PageNumber { param: "page" })
    }

    fn offset() -> EndpointDescriptor {
        descriptor(Pagination::OffsetCount {
            param: "offset",
            page_size: 100,
        })
    }

    #[test]
    fn page_number_advances_until_last() {
        let d = page_number();
        let paginator = Paginator::for_endpoint(&d);

        let first = json!({"info": {"page": 1, "pages": 3}});
        assert_eq!(paginator.next(&first, None), Some(PageToken::Page(2)));

        let last = json!({"info": {"page": 3, "pages": 3}});
        assert_eq!(paginator.next(&last, Some(PageToken::Page(3))), None);
    }

    #[test]
    fn page_number_missing_info_is_terminal() {
        let d = page_number();
        let paginator = Paginator::for_endpoint(&d);

        assert_eq!(paginator.next(&json!({"items": []}), None), None);
        assert_eq!(paginator.next(&json!({"info": "oops"}), None), None);
        assert_eq!(paginator.next(&json!({"info": {"page": "x", "pages": 4}}), None), None);
        assert_eq!(paginator.next(&json!({"info": {"page": 1, "pages": null}}), None), None);
        assert_eq!(paginator.next(&json!({"info": {"page": 1}}), None), None);
        assert_eq!(paginator.next(&json!({"info": {"page": 0}}), None), None);
        assert_eq!(paginator.next(&json!({"info": {}}), Some(PageToken::Page(2))), None);
    }

    #[test]
    fn page_number_accepts_numeric_strings() {
        let d = page_number();
        let paginator = Paginator::for_endpoint(&d);
        let body = json!({"info": {"page": "2", "pages": "5"}});
        assert_eq!(paginator.next(&body, Some(PageToken::Page(2))), Some(PageToken::Page(3)));
    }

    #[test]
    fn page_number_missing_page_uses_requested() {
        let d = page_number();
        let paginator = Paginator::for_endpoint(&d);
        let body = json!({"info": {"pages": 5}});
        assert_eq!(paginator.next(&body, None), Some(PageToken::Page(2)));
        assert_eq!(paginator.next(&body, Some(PageToken::Page(4))), Some(PageToken::Page(5)));
    }

    #[test]
    fn page_number_refuses_to_go_backwards() {
        let d = page_number();
        let paginator = Paginator::for_endpoint(&d);
        // Asked for page 3, server claims page 1 of 5.
        let body = json!({"info": {"page": 1, "pages": 5}});
        assert_eq!(paginator.next(&body, Some(PageToken::Page(3))), None);
    }

    #[test]
    fn offset_advances_on_full_pages() {
        let d = offset();
        let paginator = Paginator::for_endpoint(&d);

        let full = json!({"items": vec![json!({"id": 1}); 100]});
        assert_eq!(paginator.next(&full, None), Some(PageToken::Offset(100)));
        assert_eq!(
            paginator.next(&full, Some(PageToken::Offset(100))),
            Some(PageToken::Offset(200))
        );

        let short = json!({"items": vec![json!({"id": 1}); 99]});
        assert_eq!(paginator.next(&short, Some(PageToken::Offset(200))), None);

        assert_eq!(paginator.next(&json!({}), None), None);
    }

    #[test]
    fn single_response_never_continues() {
        let d = descriptor(Pagination::None);
        let paginator = Paginator::for_endpoint(&d);
        assert_eq!(paginator.next(&json!({"info": {"page": 1, "pages": 9}}), None), None);
    }

    proptest! {
        #[test]
        fn page_number_follows_info(page in 1u64..10_000, pages in 0u64..10_000) {
            let d = page_number();
            let paginator = Paginator::for_endpoint(&d);
            let body = json!({"info": {"page": page, "pages": pages}});
            let previous = if page > 1 { Some(PageToken::Page(page)) } else { None };

            let next = paginator.next(&body, previous);
            if page < pages {
                prop_assert_eq!(next, Some(PageToken::Page(page + 1)));
            } else {
                prop_assert_eq!(next, None);
            }
        }

        #[test]
        fn page_number_always_moves_forward(page in 0u64..50, pages in 0u64..50, requested in 1u64..50) {
            let d = page_number();
            let paginator = Paginator::for_endpoint(&d);
            let body = json!({"info": {"page": page, "pages": pages}});
            if let Some(PageToken::Page(next)) = paginator.next(&body, Some(PageToken::Page(requested))) {
                prop_assert!(next > requested);
            }
        }
    }
}
