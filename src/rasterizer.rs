//! The rendering backend seam.

use crate::document::{PageIndex, PageRegion};
use crate::pixmap::{CompressedPage, Pixmap};
use crate::request::RenderError;

/// A backend that turns a page index and a resolution into pixels.
///
/// Workers get their own instance by cloning, so `Clone` must yield an
/// independently usable handle; a backend wrapping a library that is not
/// thread-safe should open its own context per clone.
pub trait Rasterizer {
    /// Render one page at `resolution` pixels per point.
    fn render(&self, page: PageIndex, resolution: f64) -> Result<Pixmap, RenderError>;

    /// Render and compress in one step; this is what workers call.
    fn render_compressed(
        &self,
        page: PageIndex,
        resolution: f64,
    ) -> Result<CompressedPage, RenderError> {
        if resolution <= 0.0 {
            return Err(RenderError::RasterizeFailed { page, resolution });
        }
        let pixmap = self.render(page, resolution)?;
        if pixmap.is_empty() {
            return Err(RenderError::RasterizeFailed { page, resolution });
        }
        CompressedPage::from_pixmap(&pixmap, page, resolution)
    }

    /// Whether the backend can render at all (command resolved, document
    /// open, ...). Checked once at cache construction and on each
    /// synchronous fetch.
    fn is_valid(&self) -> bool;

    /// The page region this backend renders, fixed at construction.
    fn page_region(&self) -> PageRegion {
        PageRegion::Full
    }
}
