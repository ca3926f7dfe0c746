// ============================================================================
// PIXEL BUFFER: RGB image data shared between the session and filters
// ============================================================================

use image::{Rgb, RgbImage};

/// A width × height grid of 8-bit RGB pixels.
///
/// Buffers are never edited in place by the engine: every filter produces a
/// fresh buffer, so earlier ones stay valid for undo and replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbImage,
}

impl PixelBuffer {
    /// Black buffer of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
        }
    }

    pub fn from_rgb_image(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build from interleaved RGB bytes. `None` if the length doesn't match.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(|image| Self { image })
    }

    /// Build from rows of `[r, g, b]` triples, `rows[y][x]`.
    /// `None` for ragged input.
    pub fn from_rows(rows: &[Vec<[u8; 3]>]) -> Option<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len()) as u32;
        if rows.iter().any(|r| r.len() as u32 != width) {
            return None;
        }
        let data: Vec<u8> = rows.iter().flatten().flatten().copied().collect();
        Self::from_raw(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// True when there is no pixel to process.
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    /// Pixel at (x, y). Panics when out of bounds, like `RgbImage`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        *self.image.get_pixel(x, y)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Rgb<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    pub fn as_rgb_image(&self) -> &RgbImage {
        &self.image
    }
}

/// Clamp an intermediate channel value into [0, 255].
#[inline]
pub fn clamp_channel(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}
