//! Ordered page store: tri-state slots plus compressed-byte accounting.

use std::collections::BTreeMap;

use crate::document::PageIndex;
use crate::pixmap::CompressedPage;

/// One slot in the store. Absence of a key is the third state.
#[derive(Debug)]
pub enum CacheEntry {
    /// A worker is rendering this page; the slot is reserved but costs no
    /// memory.
    Pending,
    /// The compressed record is available.
    Ready(CompressedPage),
}

impl CacheEntry {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Map of cached pages, ordered by page index.
///
/// Ordering is load-bearing: eviction trims the extreme keys and region
/// widening walks contiguous keys, so this is a `BTreeMap`, not a recency
/// structure. `used_memory` counts Ready records only.
#[derive(Debug, Default)]
pub struct PageStore {
    entries: BTreeMap<PageIndex, CacheEntry>,
    used_memory: usize,
    pending: usize,
}

impl PageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, reservations included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slots holding a finished record.
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.entries.len() - self.pending
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// Compressed bytes across all Ready slots.
    #[must_use]
    pub fn used_memory(&self) -> usize {
        self.used_memory
    }

    /// True for Pending and Ready slots alike.
    #[must_use]
    pub fn contains(&self, page: PageIndex) -> bool {
        self.entries.contains_key(&page)
    }

    #[must_use]
    pub fn get_ready(&self, page: PageIndex) -> Option<&CompressedPage> {
        match self.entries.get(&page) {
            Some(CacheEntry::Ready(record)) => Some(record),
            _ => None,
        }
    }

    /// Reserve a slot for a dispatched render. No-op when the page already
    /// has a slot.
    pub fn reserve(&mut self, page: PageIndex) {
        if let std::collections::btree_map::Entry::Vacant(slot) = self.entries.entry(page) {
            slot.insert(CacheEntry::Pending);
            self.pending += 1;
        }
    }

    /// Drop the reservation for `page` if there is one. Ready slots are
    /// left alone.
    pub fn release_pending(&mut self, page: PageIndex) {
        if matches!(self.entries.get(&page), Some(CacheEntry::Pending)) {
            self.entries.remove(&page);
            self.pending -= 1;
        }
    }

    /// Store a finished record, replacing whatever held the slot.
    ///
    /// Replacing a Ready record subtracts its size first, so merging the
    /// same record again leaves `used_memory` unchanged.
    pub fn insert(&mut self, record: CompressedPage) {
        let page = record.page();
        let size = record.size();
        match self.entries.insert(page, CacheEntry::Ready(record)) {
            Some(CacheEntry::Ready(old)) => self.used_memory -= old.size(),
            Some(CacheEntry::Pending) => self.pending -= 1,
            None => {}
        }
        self.used_memory += size;
    }

    /// Remove a slot outright, adjusting the accounting.
    pub fn remove(&mut self, page: PageIndex) -> Option<CacheEntry> {
        let entry = self.entries.remove(&page)?;
        match &entry {
            CacheEntry::Ready(record) => self.used_memory -= record.size(),
            CacheEntry::Pending => self.pending -= 1,
        }
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.used_memory = 0;
        self.pending = 0;
    }

    #[must_use]
    pub fn first_key(&self) -> Option<PageIndex> {
        self.entries.first_key_value().map(|(page, _)| *page)
    }

    #[must_use]
    pub fn last_key(&self) -> Option<PageIndex> {
        self.entries.last_key_value().map(|(page, _)| *page)
    }

    pub fn pop_first(&mut self) -> Option<(PageIndex, CacheEntry)> {
        let (page, entry) = self.entries.pop_first()?;
        self.settle_pop(&entry);
        Some((page, entry))
    }

    pub fn pop_last(&mut self) -> Option<(PageIndex, CacheEntry)> {
        let (page, entry) = self.entries.pop_last()?;
        self.settle_pop(&entry);
        Some((page, entry))
    }

    fn settle_pop(&mut self, entry: &CacheEntry) {
        match entry {
            CacheEntry::Ready(record) => self.used_memory -= record.size(),
            CacheEntry::Pending => self.pending -= 1,
        }
    }
}
