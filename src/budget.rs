//! Cache limits with explicit unbounded states.

use serde::{Deserialize, Serialize};

/// Memory and entry-count limits for the cache.
///
/// `None` means unbounded. A zero bound means "cache nothing": the store is
/// emptied and background rendering stops. No arithmetic is ever done on an
/// unbounded budget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBudget {
    /// Limit on compressed bytes across all ready entries.
    pub max_memory: Option<u64>,
    /// Limit on the number of cache entries, reservations included.
    pub max_pages: Option<usize>,
}

impl CacheBudget {
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_memory: None,
            max_pages: None,
        }
    }

    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.max_memory.is_none() && self.max_pages.is_none()
    }

    /// True when either bound is zero and the cache must stay empty.
    #[must_use]
    pub fn any_zero(&self) -> bool {
        self.max_memory == Some(0) || self.max_pages == Some(0)
    }

    #[must_use]
    pub fn memory_ok(&self, used: usize) -> bool {
        self.max_memory.is_none_or(|max| used as u64 <= max)
    }

    #[must_use]
    pub fn pages_ok(&self, len: usize) -> bool {
        self.max_pages.is_none_or(|max| len <= max)
    }
}
