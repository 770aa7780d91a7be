//! Page tokens.

use std::fmt;

/// Position of the next page to request.
///
/// `None` in an `Option<PageToken>` means "first page": the request omits the
/// paging parameter and the server applies its own default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PageToken {
    /// 1-based page number.
    Page(u64),
    /// Item offset into the result set.
    Offset(u64),
}

impl PageToken {
    /// Returns the numeric value sent as the query parameter.
    pub fn value(&self) -> u64 {
        match self {
            PageToken::Page(n) | PageToken::Offset(n) => *n,
        }
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageToken::Page(n) => write!(f, "page {n}"),
            PageToken::Offset(n) => write!(f, "offset {n}"),
        }
    }
}
