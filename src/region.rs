//! The contiguous page range the scheduler keeps warm.

use crate::document::PageIndex;

/// Range of pages the cache is trying to keep present around the current
/// page.
///
/// The bounds are the next *candidates* for outward extension: they may
/// already be cached (the scheduler skips past them, moving the bound) and
/// may run outside the document while scanning. An invalid region
/// (`first > second`) is re-seeded from the current page before use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HotRegion {
    pub first: PageIndex,
    pub second: PageIndex,
}

impl HotRegion {
    #[must_use]
    pub const fn seed(page: PageIndex) -> Self {
        Self {
            first: page,
            second: page,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.first <= self.second
    }

    pub fn reseed(&mut self, page: PageIndex) {
        *self = Self::seed(page);
    }

    /// Recenter around `page` when it fell outside the region.
    ///
    /// The old span is stale in that case; the caller widens the fresh
    /// bracket back out through whatever is contiguously cached.
    pub fn include(&mut self, page: PageIndex) {
        if self.first > page || self.second < page {
            self.first = page - 1;
            self.second = page + 1;
        }
    }

    #[must_use]
    pub fn contains(&self, page: PageIndex) -> bool {
        self.first <= page && page <= self.second
    }
}
