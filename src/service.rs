//! The cache controller: scheduling, budgets, merging, synchronous fetch.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use flume::Receiver;
use log::{debug, error, trace, warn};

use crate::budget::CacheBudget;
use crate::config::{BiasWeights, CacheConfig};
use crate::document::{Document, FrameSize, PageIndex};
use crate::pixmap::{CompressedPage, Pixmap};
use crate::rasterizer::Rasterizer;
use crate::region::HotRegion;
use crate::request::{PageReady, RenderError, RenderReply};
use crate::store::{CacheEntry, PageStore};
use crate::worker::{SHUTDOWN_WAIT, WorkerPool};

/// Allowance value meaning "render as much as you like this round".
const UNLIMITED_SLOTS: i64 = i64::MAX >> 1;

/// Background raster cache for one document.
///
/// All cache state lives in this value and is mutated only from the
/// owning context: navigation and request calls mutate it directly, worker
/// replies are merged when the owner polls. Workers themselves only ever
/// see a job and the reply channel, so there is no shared cache lock.
///
/// The typical wiring drives it from a GUI event loop: forward navigation
/// and resize events, call [`request_explicit`](Self::request_explicit)
/// for pages the view waits on, and poll for [`PageReady`] events.
pub struct RenderCache<D, R> {
    doc: D,
    rasterizer: R,
    store: PageStore,
    region: HotRegion,
    priority: VecDeque<PageIndex>,
    wanted: HashSet<PageIndex>,
    budget: CacheBudget,
    epsilon: f64,
    extend_bias: BiasWeights,
    evict_bias: BiasWeights,
    retain_bias: BiasWeights,
    frame: FrameSize,
    current_page: PageIndex,
    pool: WorkerPool,
    replies: Receiver<RenderReply>,
    in_flight: usize,
    events: VecDeque<PageReady>,
}

impl<D, R> RenderCache<D, R>
where
    D: Document,
    R: Rasterizer + Clone + Send + 'static,
{
    /// Open a cache over `doc`, spawning the render workers.
    ///
    /// Documents with variable page sizes get no workers at all and are
    /// served through [`get_or_render_sync`](Self::get_or_render_sync).
    #[must_use]
    pub fn new(doc: D, rasterizer: R, config: CacheConfig) -> Self {
        let workers = if doc.has_variable_page_sizes() {
            0
        } else {
            config.workers
        };
        if !rasterizer.is_valid() {
            error!("rasterizer reported itself unusable; page rendering will fail");
        }
        let (reply_tx, replies) = flume::unbounded();
        let pool = WorkerPool::spawn(workers, &rasterizer, &reply_tx);
        debug!(
            "render cache ready: {} page(s), {} worker(s), budget {:?}",
            doc.page_count(),
            pool.worker_count(),
            config.budget()
        );
        Self {
            doc,
            rasterizer,
            store: PageStore::new(),
            region: HotRegion::seed(0),
            priority: VecDeque::new(),
            wanted: HashSet::new(),
            budget: config.budget(),
            epsilon: config.resolution_epsilon,
            extend_bias: config.extend_bias,
            evict_bias: config.evict_bias,
            retain_bias: config.retain_bias,
            frame: FrameSize::ZERO,
            current_page: 0,
            pool,
            replies,
            in_flight: 0,
            events: VecDeque::new(),
        }
    }

    /// The view moved to `page`.
    ///
    /// Re-aims the hot region: an uncached page becomes the top priority
    /// and the region collapses onto it; a cached page widens the region
    /// back out through everything contiguously cached around it. Either
    /// way a schedule cycle runs.
    pub fn on_current_page_changed(&mut self, page: PageIndex) {
        if !self.is_valid_page(page) {
            debug!("ignoring navigation to page {page} outside the document");
            return;
        }
        self.current_page = page;
        if self.store.contains(page) {
            self.region.include(page);
            self.widen_region();
        } else {
            self.priority.retain(|&queued| queued != page);
            self.priority.push_front(page);
            self.region.reseed(page);
        }
        self.schedule();
    }

    /// Ask for `page` ahead of the ambient prefetch.
    ///
    /// A compatible cached record is delivered right away as a
    /// [`PageReady`] event; otherwise the page is queued before all
    /// heuristic candidates and the event fires when its render merges.
    pub fn request_explicit(&mut self, page: PageIndex) {
        if !self.is_valid_page(page) {
            debug!("ignoring request for page {page} outside the document");
            return;
        }
        if let (Some(record), Some(want)) = (self.store.get_ready(page), self.resolution_for(page))
        {
            if record.matches_resolution(want, self.epsilon) {
                match record.decode() {
                    Ok(pixmap) => {
                        self.events.push_back(PageReady { page, pixmap });
                        return;
                    }
                    Err(err) => warn!("decoding cached page {page} failed, re-rendering: {err}"),
                }
            }
            // Stale or undecodable record: replace it with a fresh render.
            self.store.remove(page);
        }
        if !self.store.contains(page) && !self.priority.contains(&page) {
            self.priority.push_back(page);
        }
        self.wanted.insert(page);
        self.schedule();
    }

    /// Fetch a page without going through the worker pool.
    ///
    /// `resolution` defaults to the fit for the current frame. A cache hit
    /// is decoded and returned; a miss renders on the calling context and
    /// stores the compressed record (best effort) before returning. May
    /// race with the background pipeline on the same page; the later write
    /// wins either way.
    pub fn get_or_render_sync(
        &mut self,
        page: PageIndex,
        resolution: Option<f64>,
    ) -> Result<Pixmap, RenderError> {
        let resolution = match resolution {
            Some(resolution) => resolution,
            None => self
                .resolution_for(page)
                .ok_or(RenderError::InvalidPageIndex(page))?,
        };
        if let Some(record) = self.store.get_ready(page) {
            if record.matches_resolution(resolution, self.epsilon) {
                return record.decode();
            }
        }
        if !self.is_valid_page(page) {
            return Err(RenderError::InvalidPageIndex(page));
        }
        if resolution <= 0.0 {
            return Err(RenderError::RasterizeFailed { page, resolution });
        }
        if !self.rasterizer.is_valid() {
            return Err(RenderError::generic("rasterizer is not usable"));
        }
        let pixmap = self.rasterizer.render(page, resolution)?;
        if pixmap.is_empty() {
            return Err(RenderError::RasterizeFailed { page, resolution });
        }
        match CompressedPage::from_pixmap(&pixmap, page, resolution) {
            Ok(record) => self.store.insert(record),
            Err(err) => warn!("compressing page {page} failed, not caching it: {err}"),
        }
        Ok(pixmap)
    }

    /// The viewport changed size.
    ///
    /// Every cached record was rendered for the old resolution basis, so
    /// the whole cache is dropped. Results still in flight fail the
    /// resolution check when they arrive.
    pub fn on_viewport_resized(&mut self, frame: FrameSize) {
        if self.frame == frame {
            return;
        }
        debug!(
            "viewport now {:.0}x{:.0} px; clearing the cache",
            frame.width, frame.height
        );
        self.frame = frame;
        self.clear();
    }

    /// Drop every record and reservation and re-seed the region.
    ///
    /// Explicit requests (priority queue, wanted set) survive; they are
    /// served at the new resolution.
    pub fn clear(&mut self) {
        self.store.clear();
        self.region.reseed(self.current_page);
    }

    /// Replace the memory budget, shrinking right away if it is exceeded.
    pub fn set_max_memory(&mut self, max_memory: Option<u64>) {
        self.budget.max_memory = max_memory;
        if !self.budget.memory_ok(self.store.used_memory()) {
            self.limit_cache_size();
        }
    }

    /// Replace the entry-count budget, shrinking right away if exceeded.
    pub fn set_max_pages(&mut self, max_pages: Option<usize>) {
        self.budget.max_pages = max_pages;
        if !self.budget.pages_ok(self.store.len()) {
            self.limit_cache_size();
        }
    }

    /// Merge every reply that has arrived and return completion events.
    ///
    /// Non-blocking. Runs one schedule cycle when anything merged, which
    /// keeps the pipeline full without recursing.
    pub fn poll_events(&mut self) -> Vec<PageReady> {
        if self.drain_replies() > 0 {
            self.schedule();
        }
        self.events.drain(..).collect()
    }

    /// Like [`poll_events`](Self::poll_events), but wait up to `timeout`
    /// for the first reply when nothing is queued yet.
    pub fn poll_events_timeout(&mut self, timeout: Duration) -> Vec<PageReady> {
        let mut merged = 0;
        if self.events.is_empty() && self.in_flight > 0 {
            if let Ok(reply) = self.replies.recv_timeout(timeout) {
                self.handle_reply(reply);
                merged = 1;
            }
        }
        merged += self.drain_replies();
        if merged > 0 {
            self.schedule();
        }
        self.events.drain(..).collect()
    }

    fn drain_replies(&mut self) -> usize {
        let mut merged = 0;
        while let Ok(reply) = self.replies.try_recv() {
            self.handle_reply(reply);
            merged += 1;
        }
        merged
    }

    /// Fold one worker reply into the cache.
    fn handle_reply(&mut self, reply: RenderReply) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match reply {
            RenderReply::Failed { page, error } => {
                warn!("rendering page {page} failed: {error}");
                self.store.release_pending(page);
                self.wanted.remove(&page);
            }
            RenderReply::Page(record) => {
                let page = record.page();
                let keep = self
                    .resolution_for(page)
                    .is_some_and(|want| (want - record.resolution()).abs() <= self.epsilon);
                if !keep {
                    // Rendered for a viewport that no longer exists.
                    trace!(
                        "dropping stale render of page {page} at {:.3} px/pt",
                        record.resolution()
                    );
                    self.store.release_pending(page);
                    return;
                }
                let pixmap = if self.wanted.contains(&page) {
                    match record.decode() {
                        Ok(pixmap) => Some(pixmap),
                        Err(err) => {
                            warn!("decoding page {page} for delivery failed: {err}");
                            None
                        }
                    }
                } else {
                    None
                };
                trace!(
                    "page {page} ready at {:.3} px/pt, {} bytes",
                    record.resolution(),
                    record.size()
                );
                self.store.insert(record);
                if let Some(pixmap) = pixmap {
                    self.wanted.remove(&page);
                    self.events.push_back(PageReady { page, pixmap });
                }
            }
        }
    }

    /// One scheduling round: enforce the budgets, then hand every idle
    /// worker its next page.
    fn schedule(&mut self) {
        let mut allowed = self.limit_cache_size();
        if self.frame.is_empty() {
            return;
        }
        while self.in_flight < self.pool.worker_count() && allowed > 0 {
            let page = self.render_next();
            if !self.is_valid_page(page) {
                // The heuristic ran off the document; this round is done.
                return;
            }
            let Some(resolution) = self.resolution_for(page) else {
                continue;
            };
            self.store.reserve(page);
            if !self.pool.dispatch(page, resolution) {
                self.store.release_pending(page);
                warn!("job queue disconnected; dropping dispatch of page {page}");
                return;
            }
            trace!("dispatched page {page} at {resolution:.3} px/pt");
            self.in_flight += 1;
            allowed -= 1;
        }
    }

    /// Pick the page the next idle worker should render.
    ///
    /// Explicit requests first. After that the hot region extends outward
    /// from the current page, backward only while the span already runs
    /// deep ahead, skipping everything cached along the way. The returned
    /// index can lie outside the document; the caller stops the round on
    /// that.
    fn render_next(&mut self) -> PageIndex {
        while let Some(page) = self.priority.pop_front() {
            if !self.store.contains(page) {
                return page;
            }
        }
        if !self.region.is_valid() {
            self.region.reseed(self.current_page);
        }
        loop {
            if self
                .extend_bias
                .mostly_ahead(self.region.first, self.region.second, self.current_page)
                && self.region.first >= 0
            {
                let candidate = self.region.first;
                self.region.first -= 1;
                if !self.store.contains(candidate) {
                    return candidate;
                }
            } else {
                let candidate = self.region.second;
                self.region.second += 1;
                if !self.store.contains(candidate) {
                    return candidate;
                }
            }
        }
    }

    /// Enforce the budgets and report how many renders may start.
    ///
    /// Over budget, eviction drops pages from the end of the cached span
    /// that lies opposite the reading direction, and stops once the
    /// survivors fit the budgets, sit contiguously, and run mostly ahead
    /// of the current page. The last entry is never dropped. The returned
    /// allowance reflects the store after trimming; 0 means nothing may be
    /// dispatched this round.
    fn limit_cache_size(&mut self) -> i64 {
        let page_count = i64::from(self.page_count());
        if self.budget.is_unbounded() {
            if self.store.len() as i64 >= page_count {
                return 0;
            }
            return UNLIMITED_SLOTS;
        }
        if self.budget.any_zero() {
            if !self.store.is_empty() {
                debug!(
                    "cache budget is zero; dropping {} cached page(s)",
                    self.store.len()
                );
            }
            self.clear();
            return 0;
        }
        if !self.region.is_valid() {
            self.region.reseed(self.current_page);
        }
        let mut cached_slides = self.store.len() as i64 - self.in_flight as i64;
        if cached_slides <= 0 {
            return UNLIMITED_SLOTS;
        }
        // The sync path must respect the budget too, so a workerless pool
        // still counts as one slot here.
        let workers = (self.pool.worker_count() as i64).max(1);
        let allowed = self.allowance(cached_slides);
        if allowed >= workers {
            return allowed;
        }
        let (Some(mut first), Some(mut last)) = (self.store.first_key(), self.store.last_key())
        else {
            return allowed.max(0);
        };
        trace!(
            "cache over budget: {} entries, {} bytes, span {first}..={last}",
            self.store.len(),
            self.store.used_memory()
        );
        loop {
            let len = self.store.len();
            if len < 2 {
                break;
            }
            let within = self.budget.memory_ok(self.store.used_memory())
                && self.budget.pages_ok(len);
            let simply_connected = i64::from(last) - i64::from(first) <= len as i64;
            if within
                && last > self.current_page
                && simply_connected
                && self
                    .retain_bias
                    .mostly_ahead(first, last, self.current_page)
            {
                // The survivors fit and have the shape we want. Stop with a
                // hard zero: handing out the leftover allowance here would
                // re-render exactly what the next round evicts again.
                return 0;
            }
            let popped = if self
                .evict_bias
                .mostly_ahead(first, last, self.current_page)
            {
                let popped = self.store.pop_last();
                if let Some(key) = self.store.last_key() {
                    last = key;
                }
                popped
            } else {
                let popped = self.store.pop_first();
                if let Some(key) = self.store.first_key() {
                    first = key;
                }
                popped
            };
            let Some((page, entry)) = popped else {
                break;
            };
            match entry {
                // Dropping a reservation: the render is still in flight
                // and re-merges (or gets dropped) like any other reply.
                CacheEntry::Pending => continue,
                CacheEntry::Ready(record) => {
                    trace!("evicted page {page}, {} bytes", record.size());
                    cached_slides -= 1;
                }
            }
            if self.allowance(cached_slides) >= workers {
                break;
            }
            if cached_slides <= 0 {
                break;
            }
        }
        if let (Some(first), Some(last)) = (self.store.first_key(), self.store.last_key()) {
            if first > self.region.first + 1 {
                self.region.first = first - 1;
            }
            if last + 1 < self.region.second {
                self.region.second = last + 1;
            }
        }
        self.allowance(cached_slides).max(0)
    }

    /// How many more pages fit, by the current accounting.
    ///
    /// Memory side: scale the remaining bytes by the average cached record
    /// (negative when over budget). Count side: clamp to the remaining
    /// slots. Unbounded axes impose nothing; budgets beyond the signed
    /// range saturate instead of wrapping.
    fn allowance(&self, cached_slides: i64) -> i64 {
        let used = self.store.used_memory() as i64;
        let mut allowed = match self.budget.max_memory {
            Some(max) if used > 0 => {
                // Scaled in i128: spare bytes times cached_slides can
                // overflow i64 for large budgets.
                let max = i64::try_from(max).unwrap_or(i64::MAX);
                let scaled = (i128::from(max) - i128::from(used)) * i128::from(cached_slides)
                    / i128::from(used);
                i64::try_from(scaled).unwrap_or(i64::MAX).min(UNLIMITED_SLOTS)
            }
            Some(_) => self.pool.worker_count() as i64,
            None => UNLIMITED_SLOTS,
        };
        if let Some(max_pages) = self.budget.max_pages {
            let max_pages = i64::try_from(max_pages).unwrap_or(i64::MAX);
            let len = self.store.len() as i64;
            if allowed.saturating_add(len) > max_pages {
                allowed = max_pages - len;
            }
        }
        allowed
    }

    fn widen_region(&mut self) {
        while self.store.contains(self.region.first) {
            self.region.first -= 1;
        }
        while self.store.contains(self.region.second) {
            self.region.second += 1;
        }
    }

    /// Fit resolution for `page` in the current frame, width-adjusted for
    /// half-page rasterizers. `None` for invalid pages or an unset frame.
    fn resolution_for(&self, page: PageIndex) -> Option<f64> {
        if !self.is_valid_page(page) {
            return None;
        }
        let mut size = self.doc.page_size(page);
        size.width *= self.rasterizer.page_region().width_share();
        size.fit_resolution(self.frame)
    }

    fn page_count(&self) -> PageIndex {
        PageIndex::try_from(self.doc.page_count()).unwrap_or(PageIndex::MAX)
    }

    fn is_valid_page(&self, page: PageIndex) -> bool {
        page >= 0 && page < self.page_count()
    }
}

impl<D, R> RenderCache<D, R> {
    /// Pages with a finished record in the cache.
    #[must_use]
    pub fn cached_pages(&self) -> usize {
        self.store.ready_count()
    }

    /// Compressed bytes currently held.
    #[must_use]
    pub fn used_memory(&self) -> usize {
        self.store.used_memory()
    }

    /// True when `page` has a finished record (a reservation is not
    /// cached yet).
    #[must_use]
    pub fn is_page_cached(&self, page: PageIndex) -> bool {
        self.store.get_ready(page).is_some()
    }

    /// Renders currently running or queued on workers.
    #[must_use]
    pub fn busy_workers(&self) -> usize {
        self.in_flight
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    #[must_use]
    pub fn current_page(&self) -> PageIndex {
        self.current_page
    }

    #[must_use]
    pub fn hot_region(&self) -> HotRegion {
        self.region
    }

    #[must_use]
    pub fn budget(&self) -> CacheBudget {
        self.budget
    }

    /// Stop the workers, waiting briefly for the page each is on.
    pub fn shutdown(&mut self) {
        self.pool.shutdown(SHUTDOWN_WAIT);
    }
}

impl<D, R> Drop for RenderCache<D, R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeDocument, FakeRasterizer};

    /// Cache with no workers at all: every mutation happens in the test
    /// thread, so scheduling decisions can be asserted step by step.
    fn workerless(pages: u32) -> RenderCache<FakeDocument, FakeRasterizer> {
        workerless_with(pages, CacheConfig::default())
    }

    fn workerless_with(pages: u32, mut config: CacheConfig) -> RenderCache<FakeDocument, FakeRasterizer> {
        config.workers = 0;
        let mut cache = RenderCache::new(FakeDocument::new(pages), FakeRasterizer::new(), config);
        // 100x100 pt pages in a 100x100 px frame: fit resolution 1.0.
        cache.frame = FrameSize::new(100.0, 100.0);
        cache
    }

    fn test_record(page: PageIndex, resolution: f64) -> CompressedPage {
        FakeRasterizer::new()
            .render_compressed(page, resolution)
            .unwrap()
    }

    #[test]
    fn render_next_serves_explicit_requests_first() {
        let mut cache = workerless(10);
        cache.priority.push_back(9);

        assert_eq!(cache.render_next(), 9);
        // With the queue drained the region heuristic takes over at the
        // current page.
        assert_eq!(cache.render_next(), 0);
    }

    #[test]
    fn render_next_skips_cached_pages_while_extending() {
        let mut cache = workerless(10);
        cache.store.insert(test_record(0, 1.0));
        cache.store.insert(test_record(1, 1.0));

        assert_eq!(cache.render_next(), 2);
    }

    #[test]
    fn render_next_runs_off_the_document_when_everything_ahead_is_cached() {
        let mut cache = workerless(3);
        for page in 0..3 {
            cache.store.insert(test_record(page, 1.0));
        }

        let candidate = cache.render_next();
        assert!(candidate < 0 || candidate >= 3, "got candidate {candidate}");
    }

    #[test]
    fn merge_drops_results_for_a_superseded_resolution() {
        let mut cache = workerless(10);
        cache.store.reserve(0);
        cache.in_flight = 1;

        // Rendered while the frame was twice as large.
        cache.handle_reply(RenderReply::Page(test_record(0, 2.0)));
        assert_eq!(cache.busy_workers(), 0);
        assert!(!cache.store.contains(0));
        assert_eq!(cache.used_memory(), 0);

        cache.store.reserve(0);
        cache.in_flight = 1;
        cache.handle_reply(RenderReply::Page(test_record(0, 1.0)));
        assert!(cache.is_page_cached(0));
        assert!(cache.used_memory() > 0);
    }

    #[test]
    fn merge_failure_releases_the_reservation() {
        let mut cache = workerless(10);
        cache.store.reserve(4);
        cache.in_flight = 1;

        cache.handle_reply(RenderReply::Failed {
            page: 4,
            error: RenderError::RasterizeFailed {
                page: 4,
                resolution: 1.0,
            },
        });
        assert!(!cache.store.contains(4));
        assert_eq!(cache.busy_workers(), 0);
    }

    #[test]
    fn merging_the_same_record_twice_keeps_the_accounting() {
        let mut cache = workerless(10);
        cache.handle_reply(RenderReply::Page(test_record(3, 1.0)));
        let used = cache.used_memory();

        cache.handle_reply(RenderReply::Page(test_record(3, 1.0)));
        assert_eq!(cache.used_memory(), used);
        assert_eq!(cache.cached_pages(), 1);
    }

    #[test]
    fn zero_budget_clears_and_allows_nothing() {
        let mut cache = workerless_with(10, CacheConfig {
            max_pages: Some(0),
            ..CacheConfig::default()
        });
        cache.store.insert(test_record(0, 1.0));
        cache.store.insert(test_record(1, 1.0));

        assert_eq!(cache.limit_cache_size(), 0);
        assert_eq!(cache.cached_pages(), 0);
        assert_eq!(cache.used_memory(), 0);
    }

    #[test]
    fn unbounded_budget_never_evicts() {
        let mut cache = workerless(10);
        for page in 0..5 {
            cache.store.insert(test_record(page, 1.0));
        }

        assert!(cache.limit_cache_size() > 1_000);
        assert_eq!(cache.cached_pages(), 5);
    }

    #[test]
    fn unbounded_budget_stops_once_the_whole_document_is_cached() {
        let mut cache = workerless(5);
        for page in 0..5 {
            cache.store.insert(test_record(page, 1.0));
        }

        assert_eq!(cache.limit_cache_size(), 0);
        assert_eq!(cache.cached_pages(), 5);
    }

    #[test]
    fn a_gigantic_budget_does_not_wrap_into_a_parked_cache() {
        let mut cache = workerless_with(10, CacheConfig {
            max_memory: Some(u64::MAX),
            max_pages: Some(usize::MAX),
            ..CacheConfig::default()
        });
        for page in 0..3 {
            cache.store.insert(test_record(page, 1.0));
        }

        // Both bounds exceed i64; the allowance must stay hugely positive,
        // not wrap negative and stall every dispatch.
        assert!(cache.limit_cache_size() > 1_000);
        assert_eq!(cache.cached_pages(), 3);
    }

    #[test]
    fn memory_pressure_evicts_the_slides_behind_first() {
        let mut cache = workerless(10);
        cache.current_page = 5;
        for page in 3..=6 {
            cache.store.insert(test_record(page, 1.0));
        }
        let record_size = cache.used_memory() / 4;
        cache.budget.max_memory = Some((record_size * 5 / 2) as u64);

        cache.limit_cache_size();
        assert!(cache.budget.memory_ok(cache.used_memory()));
        assert!(!cache.is_page_cached(3));
        assert!(!cache.is_page_cached(4));
        assert!(cache.is_page_cached(5));
        assert!(cache.is_page_cached(6));
    }

    #[test]
    fn memory_floor_keeps_one_entry_even_over_budget() {
        let mut cache = workerless(10);
        for page in 0..3 {
            cache.store.insert(test_record(page, 1.0));
        }

        cache.set_max_memory(Some(10));
        assert_eq!(cache.cached_pages(), 1);
        // A single oversized record may stay; shrinking below one entry
        // would leave nothing to show at all.
        assert!(cache.used_memory() > 10);
    }

    #[test]
    fn shrinking_the_page_budget_applies_immediately() {
        let mut cache = workerless(10);
        for page in 0..3 {
            cache.store.insert(test_record(page, 1.0));
        }

        cache.set_max_pages(Some(1));
        assert_eq!(cache.cached_pages(), 1);

        // Raising it back does not render anything by itself.
        cache.set_max_pages(Some(5));
        assert_eq!(cache.cached_pages(), 1);
    }

    #[test]
    fn eviction_with_a_count_budget_stops_at_the_retain_shape() {
        let mut cache = workerless_with(10, CacheConfig {
            max_pages: Some(3),
            ..CacheConfig::default()
        });
        cache.current_page = 5;
        for page in 3..=7 {
            cache.store.insert(test_record(page, 1.0));
        }

        assert_eq!(cache.limit_cache_size(), 0);
        // 5 entries shrink onto the forward-leaning block around page 5.
        assert_eq!(cache.cached_pages(), 3);
        for page in [5, 6, 7] {
            assert!(cache.is_page_cached(page), "page {page} missing");
        }
        assert!(!cache.is_page_cached(3));
        assert!(!cache.is_page_cached(4));
    }

    #[test]
    fn navigation_to_an_uncached_page_reseeds_and_prioritizes() {
        let mut cache = workerless(10);
        cache.on_current_page_changed(5);

        assert_eq!(cache.current_page(), 5);
        assert_eq!(cache.priority.front(), Some(&5));
        assert_eq!(cache.hot_region(), HotRegion { first: 5, second: 5 });
    }

    #[test]
    fn navigation_to_a_cached_page_widens_through_neighbors() {
        let mut cache = workerless(10);
        for page in 4..=6 {
            cache.store.insert(test_record(page, 1.0));
        }

        cache.on_current_page_changed(5);
        assert!(cache.priority.is_empty());
        let region = cache.hot_region();
        assert_eq!(region, HotRegion { first: 3, second: 7 });
        assert!(region.first <= 5 && 5 <= region.second);
    }

    #[test]
    fn navigation_outside_the_document_is_ignored() {
        let mut cache = workerless(10);
        cache.on_current_page_changed(3);
        cache.on_current_page_changed(-1);
        cache.on_current_page_changed(10);

        assert_eq!(cache.current_page(), 3);
    }

    #[test]
    fn viewport_resize_clears_only_on_change() {
        let mut cache = workerless(10);
        cache.on_viewport_resized(FrameSize::new(100.0, 100.0));
        cache.store.insert(test_record(0, 1.0));

        cache.on_viewport_resized(FrameSize::new(100.0, 100.0));
        assert_eq!(cache.cached_pages(), 1);

        cache.on_viewport_resized(FrameSize::new(200.0, 100.0));
        assert_eq!(cache.cached_pages(), 0);
        assert_eq!(cache.used_memory(), 0);
    }

    #[test]
    fn explicit_request_delivers_cached_hits_immediately() {
        let mut cache = workerless(10);
        cache.store.insert(test_record(2, 1.0));

        cache.request_explicit(2);
        let events = cache.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].page, 2);
        assert_eq!(events[0].pixmap.width, 100);
        assert_eq!(events[0].pixmap.height, 100);
        // The fake paints the page index into every channel.
        assert_eq!(events[0].pixmap.data[0], 2);
    }

    #[test]
    fn explicit_request_replaces_a_stale_record() {
        let mut cache = workerless(10);
        cache.store.insert(test_record(2, 3.0));

        cache.request_explicit(2);
        assert!(cache.poll_events().is_empty());
        assert!(!cache.is_page_cached(2));
        assert_eq!(cache.priority.front(), Some(&2));
        assert!(cache.wanted.contains(&2));
    }

    #[test]
    fn explicit_request_outside_the_document_is_ignored() {
        let mut cache = workerless(10);
        cache.request_explicit(-1);
        cache.request_explicit(10);

        assert!(cache.priority.is_empty());
        assert!(cache.poll_events().is_empty());
    }

    #[test]
    fn sync_fetch_renders_once_then_hits() {
        let rasterizer = FakeRasterizer::new();
        let mut config = CacheConfig::default();
        config.workers = 0;
        let mut cache = RenderCache::new(FakeDocument::new(10), rasterizer.clone(), config);
        cache.frame = FrameSize::new(100.0, 100.0);

        let first = cache.get_or_render_sync(4, None).unwrap();
        assert_eq!((first.width, first.height), (100, 100));
        assert_eq!(rasterizer.render_calls(), 1);
        assert!(cache.is_page_cached(4));

        let second = cache.get_or_render_sync(4, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(rasterizer.render_calls(), 1);
    }

    #[test]
    fn sync_fetch_rerenders_at_an_explicit_resolution() {
        let mut cache = workerless(10);
        let _ = cache.get_or_render_sync(1, None).unwrap();

        // A magnifier asks for double resolution: miss, fresh render, and
        // the stored record follows the new resolution.
        let enlarged = cache.get_or_render_sync(1, Some(2.0)).unwrap();
        assert_eq!((enlarged.width, enlarged.height), (200, 200));
        assert!((cache.store.get_ready(1).unwrap().resolution() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sync_fetch_validates_page_and_rasterizer() {
        let mut cache = workerless(10);
        assert!(matches!(
            cache.get_or_render_sync(-3, None),
            Err(RenderError::InvalidPageIndex(-3))
        ));
        assert!(matches!(
            cache.get_or_render_sync(10, Some(1.0)),
            Err(RenderError::InvalidPageIndex(10))
        ));

        let mut config = CacheConfig::default();
        config.workers = 0;
        let mut broken = RenderCache::new(
            FakeDocument::new(10),
            FakeRasterizer::new().invalid(),
            config,
        );
        broken.frame = FrameSize::new(100.0, 100.0);
        assert!(broken.get_or_render_sync(0, None).is_err());
    }

    #[test]
    fn variable_page_sizes_force_a_workerless_pool() {
        let cache = RenderCache::new(
            FakeDocument::new(10).with_variable_page_sizes(),
            FakeRasterizer::new(),
            CacheConfig::default(),
        );
        assert_eq!(cache.worker_count(), 0);
    }
}
