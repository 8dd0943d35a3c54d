//! Shared fakes for tests: an in-memory document and rasterizer.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::document::{Document, PageIndex, PageRegion, PageSize};
use crate::pixmap::Pixmap;
use crate::rasterizer::Rasterizer;
use crate::request::RenderError;

/// Document with `pages` equally sized pages (100x100 pt by default).
#[derive(Clone, Debug)]
pub struct FakeDocument {
    pages: u32,
    size: PageSize,
    variable: bool,
}

impl FakeDocument {
    pub fn new(pages: u32) -> Self {
        Self {
            pages,
            size: PageSize::new(100.0, 100.0),
            variable: false,
        }
    }

    pub fn with_page_size(mut self, size: PageSize) -> Self {
        self.size = size;
        self
    }

    /// Report varying page sizes, which forces a workerless cache.
    pub fn with_variable_page_sizes(mut self) -> Self {
        self.variable = true;
        self
    }
}

impl Document for FakeDocument {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn page_size(&self, page: PageIndex) -> PageSize {
        if page >= 0 && (page as u32) < self.pages {
            self.size
        } else {
            PageSize::empty()
        }
    }

    fn has_variable_page_sizes(&self) -> bool {
        self.variable
    }
}

/// Rasterizer that paints a flat page-numbered shade and counts calls.
///
/// Clones share the call counter and failure set, so a test can hand the
/// cache one instance and keep asserting on its own copy.
#[derive(Clone)]
pub struct FakeRasterizer {
    page_size: PageSize,
    region: PageRegion,
    valid: bool,
    fail_pages: Arc<HashSet<PageIndex>>,
    calls: Arc<AtomicUsize>,
}

impl FakeRasterizer {
    pub fn new() -> Self {
        Self {
            page_size: PageSize::new(100.0, 100.0),
            region: PageRegion::Full,
            valid: true,
            fail_pages: Arc::new(HashSet::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_page_size(mut self, size: PageSize) -> Self {
        self.page_size = size;
        self
    }

    pub fn with_region(mut self, region: PageRegion) -> Self {
        self.region = region;
        self
    }

    /// Make `render` fail for the given pages.
    pub fn failing_on(mut self, pages: impl IntoIterator<Item = PageIndex>) -> Self {
        self.fail_pages = Arc::new(pages.into_iter().collect());
        self
    }

    pub fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }

    /// Total `render` calls across the cache and all workers.
    pub fn render_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FakeRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for FakeRasterizer {
    fn render(&self, page: PageIndex, resolution: f64) -> Result<Pixmap, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pages.contains(&page) {
            return Err(RenderError::RasterizeFailed { page, resolution });
        }
        let width = (self.page_size.width * self.region.width_share() * resolution)
            .round()
            .max(1.0) as u32;
        let height = (self.page_size.height * resolution).round().max(1.0) as u32;
        let shade = page.rem_euclid(251) as u8;
        let data = vec![shade; width as usize * height as usize * 3];
        Ok(Pixmap::new(width, height, data))
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn page_region(&self) -> PageRegion {
        self.region
    }
}
