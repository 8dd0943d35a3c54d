//! Pixel buffers and the compressed page records the cache stores.

use std::fmt;

use crate::document::PageIndex;
use crate::request::RenderError;

/// Uncompressed RGB8 page image, row-major, 3 bytes per pixel.
#[derive(Clone, PartialEq, Eq)]
pub struct Pixmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Pixmap {
    #[must_use]
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 3);
        Self {
            width,
            height,
            data,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }
}

impl fmt::Debug for Pixmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pixmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Immutable compressed form of one rendered page.
///
/// Carries the page index and the resolution it was rendered at; the image
/// itself is PNG so a cached slide costs compressed bytes, not raw pixels.
/// Decoding happens only when a caller is handed the page.
#[derive(Clone)]
pub struct CompressedPage {
    page: PageIndex,
    resolution: f64,
    data: Vec<u8>,
}

impl CompressedPage {
    /// Compress a rendered pixmap into a cacheable record.
    pub fn from_pixmap(
        pixmap: &Pixmap,
        page: PageIndex,
        resolution: f64,
    ) -> Result<Self, RenderError> {
        let mut data = Vec::new();
        let mut encoder = png::Encoder::new(&mut data, pixmap.width, pixmap.height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&pixmap.data)?;
        writer.finish()?;
        Ok(Self {
            page,
            resolution,
            data,
        })
    }

    #[must_use]
    pub fn page(&self) -> PageIndex {
        self.page
    }

    /// Resolution this record was rendered at, in pixels per point.
    #[must_use]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Compressed size in bytes, the unit of the memory budget.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// True when `resolution` is close enough to treat this record as a hit.
    #[must_use]
    pub fn matches_resolution(&self, resolution: f64, epsilon: f64) -> bool {
        (self.resolution - resolution).abs() < epsilon
    }

    /// Decode back into pixels.
    pub fn decode(&self) -> Result<Pixmap, RenderError> {
        let decoder = png::Decoder::new(self.data.as_slice());
        let mut reader = decoder.read_info()?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf)?;
        if info.color_type != png::ColorType::Rgb || info.bit_depth != png::BitDepth::Eight {
            return Err(RenderError::generic(format!(
                "unexpected pixel format in cached page {}: {:?}/{:?}",
                self.page, info.color_type, info.bit_depth
            )));
        }
        buf.truncate(info.buffer_size());
        Ok(Pixmap::new(info.width, info.height, buf))
    }
}

impl fmt::Debug for CompressedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressedPage")
            .field("page", &self.page)
            .field("resolution", &self.resolution)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pixmap() -> Pixmap {
        // 2x2, four distinct pixels so row order mistakes would show up.
        Pixmap::new(
            2,
            2,
            vec![
                255, 0, 0, //
                0, 255, 0, //
                0, 0, 255, //
                255, 255, 0,
            ],
        )
    }

    #[test]
    fn compressed_record_round_trips_pixels() {
        let pixmap = test_pixmap();
        let record = CompressedPage::from_pixmap(&pixmap, 3, 1.5).unwrap();
        assert_eq!(record.page(), 3);
        assert!(record.size() > 0);

        let decoded = record.decode().unwrap();
        assert_eq!(decoded, pixmap);
    }

    #[test]
    fn resolution_match_is_strict_at_the_epsilon() {
        let record = CompressedPage::from_pixmap(&test_pixmap(), 0, 2.0).unwrap();
        assert!(record.matches_resolution(2.04, 0.05));
        assert!(record.matches_resolution(1.96, 0.05));
        assert!(!record.matches_resolution(2.06, 0.05));
        assert!(!record.matches_resolution(2.2, 0.05));

        // A distance equal to the epsilon is a miss. Dyadic values keep
        // the subtraction exact, so the boundary itself can be pinned.
        assert!(record.matches_resolution(2.03125, 0.0625));
        assert!(!record.matches_resolution(2.0625, 0.0625));
    }
}
