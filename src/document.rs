//! Document geometry contract: page counts, page sizes, fit resolution.

/// Page index within a document.
///
/// Signed so that callers can use negative indices as sentinel pages (for
/// example a generated cover) and so that region bounds can walk below zero
/// while scanning. Scheduling only ever dispatches indices in
/// `0..page_count`.
pub type PageIndex = i32;

/// Page size in document points (1/72 inch).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size reported for invalid pages.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Resolution (pixels per point) that fits this page inside `frame`.
    ///
    /// Scales along the limiting axis: the width when the page is
    /// proportionally wider than the frame, the height otherwise. Returns
    /// `None` when either size is degenerate.
    #[must_use]
    pub fn fit_resolution(&self, frame: FrameSize) -> Option<f64> {
        if self.is_empty() || frame.is_empty() {
            return None;
        }
        if self.width * frame.height > self.height * frame.width {
            Some(frame.width / self.width)
        } else {
            Some(frame.height / self.height)
        }
    }
}

/// Viewport size in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSize {
    pub width: f64,
    pub height: f64,
}

impl FrameSize {
    /// The unset viewport; nothing is prefetched until a real size arrives.
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Part of the page a rasterizer produces.
///
/// Split-screen setups show one half of each page per window; the half
/// regions halve the page width before the fit computation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PageRegion {
    #[default]
    Full,
    LeftHalf,
    RightHalf,
}

impl PageRegion {
    /// Fraction of the page width this region covers.
    #[must_use]
    pub fn width_share(self) -> f64 {
        match self {
            Self::Full => 1.0,
            Self::LeftHalf | Self::RightHalf => 0.5,
        }
    }
}

/// Read-only geometry view of an open document.
///
/// The cache only needs counting and measuring; parsing and rendering live
/// behind [`crate::Rasterizer`].
pub trait Document {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Size of the given page in points; empty for invalid indices.
    fn page_size(&self, page: PageIndex) -> PageSize;

    /// True when pages have differing sizes. Such documents get no
    /// background workers and are served through the synchronous path.
    fn has_variable_page_sizes(&self) -> bool {
        false
    }
}
