//! Messages between the cache controller and its render workers.

use crate::document::PageIndex;
use crate::pixmap::{CompressedPage, Pixmap};

/// Job handed to a render worker over the shared queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderJob {
    /// Render one page at the given resolution (pixels per point).
    Page { page: PageIndex, resolution: f64 },
    /// Finish up and exit the worker loop.
    Shutdown,
}

/// What a worker sends back for one job.
#[derive(Debug)]
pub enum RenderReply {
    /// The page rendered and compressed fine.
    Page(CompressedPage),
    /// Rendering failed; the reservation for `page` must be released.
    Failed { page: PageIndex, error: RenderError },
}

/// Completion event for an explicitly requested page.
///
/// The pixmap is decoded from the cached record at delivery time.
#[derive(Debug)]
pub struct PageReady {
    pub page: PageIndex,
    pub pixmap: Pixmap,
}

/// Errors from rendering, compressing, or fetching pages.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("page index {0} out of range")]
    InvalidPageIndex(PageIndex),

    #[error("rasterizer produced no image for page {page} at {resolution:.3} px/pt")]
    RasterizeFailed { page: PageIndex, resolution: f64 },

    #[error("png encode: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("png decode: {0}")]
    Decode(#[from] png::DecodingError),

    #[error("{detail}")]
    Generic { detail: String },
}

impl RenderError {
    /// Backend-specific failure with a human-readable detail.
    pub fn generic(detail: impl Into<String>) -> Self {
        Self::Generic {
            detail: detail.into(),
        }
    }
}
