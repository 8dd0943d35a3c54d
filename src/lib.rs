//! Background raster cache for slide presentation viewers.
//!
//! Renders document pages to compressed records on worker threads, keeps
//! the cache biased ahead of the page currently shown, and evicts under a
//! memory or entry-count budget. The owning thread drives everything:
//! it forwards navigation, resize and page requests into [`RenderCache`]
//! and polls it for [`PageReady`] events.

pub mod budget;
pub mod config;
pub mod document;
pub mod pixmap;
pub mod rasterizer;
pub mod region;
pub mod request;
pub mod service;
pub mod store;
mod worker;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use budget::CacheBudget;
pub use config::{BiasWeights, CacheConfig, DEFAULT_RESOLUTION_EPSILON, DEFAULT_WORKER_COUNT};
pub use document::{Document, FrameSize, PageIndex, PageRegion, PageSize};
pub use pixmap::{CompressedPage, Pixmap};
pub use rasterizer::Rasterizer;
pub use region::HotRegion;
pub use request::{PageReady, RenderError};
pub use service::RenderCache;
