// ============================================================================
// IMAGE I/O: decode into a PixelBuffer, encode a PixelBuffer to disk
// ============================================================================

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::codecs::tiff::TiffEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, ImageEncoder, ImageError, RgbImage};

use crate::canvas::PixelBuffer;
use crate::error::{EditError, Result};

/// Default JPEG quality when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

// ============================================================================
// LOADING
// ============================================================================

/// Optional bounding box for loading. With one side set the other follows the
/// aspect ratio; with both set the image fits inside the box. Images are only
/// ever shrunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaxDimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl MaxDimensions {
    pub const NONE: MaxDimensions = MaxDimensions {
        width: None,
        height: None,
    };

    pub fn width(width: u32) -> Self {
        Self { width: Some(width), height: None }
    }

    pub fn height(height: u32) -> Self {
        Self { width: None, height: Some(height) }
    }

    pub fn is_none(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }

    /// Target size for a `width` × `height` source, or `None` if it already fits.
    pub fn fit(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width == 0 || height == 0 {
            return None;
        }
        let w_ratio = self.width.map(|mw| mw as f64 / width as f64);
        let h_ratio = self.height.map(|mh| mh as f64 / height as f64);
        let ratio = match (w_ratio, h_ratio) {
            (None, None) => return None,
            (Some(w), None) => w,
            (None, Some(h)) => h,
            (Some(w), Some(h)) => w.min(h),
        };
        if ratio >= 1.0 {
            return None;
        }
        let new_w = ((width as f64 * ratio).round() as u32).max(1);
        let new_h = ((height as f64 * ratio).round() as u32).max(1);
        Some((new_w, new_h))
    }
}

/// Decode `path` into an RGB buffer, shrinking it to fit `max`.
pub fn load_image(path: &Path, max: MaxDimensions) -> Result<PixelBuffer> {
    if !path.exists() {
        return Err(EditError::NotFound(path.to_path_buf()));
    }

    let io_err = |e: std::io::Error| EditError::from_decode(path, ImageError::IoError(e));
    // Sniff the content so a misnamed extension still decodes.
    let decoded = image::io::Reader::open(path)
        .map_err(io_err)?
        .with_guessed_format()
        .map_err(io_err)?
        .decode()
        .map_err(|e| EditError::from_decode(path, e))?;

    let buffer = PixelBuffer::from_rgb_image(decoded.to_rgb8());
    Ok(fit_within(&buffer, max).unwrap_or(buffer))
}

/// Lanczos3 downscale of `buffer` into `max`, or `None` if it already fits.
pub fn fit_within(buffer: &PixelBuffer, max: MaxDimensions) -> Option<PixelBuffer> {
    let (w, h) = max.fit(buffer.width(), buffer.height())?;
    Some(PixelBuffer::from_rgb_image(imageops::resize(
        buffer.as_rgb_image(),
        w,
        h,
        FilterType::Lanczos3,
    )))
}

// ============================================================================
// SAVING
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveFormat {
    Png,
    Jpeg,
    Bmp,
    Tga,
    Tiff,
}

impl SaveFormat {
    /// Parse a format name or file extension (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().trim_start_matches('.').to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "bmp" => Some(SaveFormat::Bmp),
            "tga" => Some(SaveFormat::Tga),
            "tif" | "tiff" => Some(SaveFormat::Tiff),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_name)
            .ok_or_else(|| {
                EditError::Encode(format!("unsupported output format for '{}'", path.display()))
            })
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
            SaveFormat::Tiff => "tiff",
        }
    }
}

/// Encode `buffer` to `path`, overwriting it. The format follows the extension.
pub fn save_image(buffer: &PixelBuffer, path: &Path) -> Result<()> {
    save_image_with(buffer, path, SaveFormat::from_path(path)?, DEFAULT_JPEG_QUALITY)
}

pub fn save_image_with(
    buffer: &PixelBuffer,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> Result<()> {
    if buffer.is_empty() {
        return Err(EditError::InvalidState("cannot save an empty buffer".to_string()));
    }
    encode_and_write(buffer.as_rgb_image(), path, format, quality)
}

/// Encode and write an RGB image. Standalone so background jobs can call it.
pub fn encode_and_write(
    image: &RgbImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let (w, h) = image.dimensions();
    let raw = image.as_raw();

    let encoded: std::result::Result<(), ImageError> = match format {
        SaveFormat::Png => PngEncoder::new(&mut writer).write_image(raw, w, h, ColorType::Rgb8),
        SaveFormat::Jpeg => JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100))
            .encode(raw, w, h, ColorType::Rgb8),
        SaveFormat::Bmp => BmpEncoder::new(&mut writer).encode(raw, w, h, ColorType::Rgb8),
        SaveFormat::Tga => TgaEncoder::new(&mut writer).encode(raw, w, h, ColorType::Rgb8),
        SaveFormat::Tiff => TiffEncoder::new(&mut writer).encode(raw, w, h, ColorType::Rgb8),
    };
    encoded.map_err(EditError::from_encode)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::path::PathBuf;

    fn temp_path(ext: &str) -> PathBuf {
        std::env::temp_dir().join(format!("filterlab-io-{}.{}", uuid::Uuid::new_v4(), ext))
    }

    fn gradient(w: u32, h: u32) -> PixelBuffer {
        PixelBuffer::from_rgb_image(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 10) as u8, (y * 10) as u8, 77])
        }))
    }

    #[test]
    fn fit_follows_aspect_ratio_for_one_side() {
        assert_eq!(MaxDimensions::height(200).fit(800, 400), Some((400, 200)));
        assert_eq!(MaxDimensions::width(100).fit(400, 300), Some((100, 75)));
    }

    #[test]
    fn fit_uses_tighter_side_of_a_box() {
        let max = MaxDimensions { width: Some(100), height: Some(100) };
        assert_eq!(max.fit(400, 200), Some((100, 50)));
    }

    #[test]
    fn fit_never_enlarges() {
        assert_eq!(MaxDimensions::height(200).fit(20, 10), None);
        assert_eq!(MaxDimensions::NONE.fit(4000, 3000), None);
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = temp_path("png");
        let err = load_image(&path, MaxDimensions::NONE).unwrap_err();
        assert!(matches!(err, EditError::NotFound(p) if p == path));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let path = temp_path("png");
        std::fs::write(&path, b"definitely not an image").unwrap();
        let err = load_image(&path, MaxDimensions::NONE).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, EditError::Decode(_)), "got {:?}", err);
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let path = temp_path("png");
        let buf = gradient(5, 3);
        save_image(&buf, &path).unwrap();
        let back = load_image(&path, MaxDimensions::NONE).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(back, buf);
    }

    #[test]
    fn load_shrinks_to_fit() {
        let path = temp_path("png");
        save_image(&gradient(20, 10), &path).unwrap();
        let loaded = load_image(&path, MaxDimensions::height(5)).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.dimensions(), (10, 5));
    }

    #[test]
    fn fit_within_leaves_small_buffers_alone() {
        assert!(fit_within(&gradient(4, 4), MaxDimensions::height(8)).is_none());
        let shrunk = fit_within(&gradient(8, 4), MaxDimensions::width(4)).unwrap();
        assert_eq!(shrunk.dimensions(), (4, 2));
    }

    #[test]
    fn unknown_extension_is_an_encode_error() {
        let err = save_image(&gradient(2, 2), Path::new("out.xyz")).unwrap_err();
        assert!(matches!(err, EditError::Encode(_)));
    }

    #[test]
    fn save_format_names() {
        assert_eq!(SaveFormat::from_name("JPEG"), Some(SaveFormat::Jpeg));
        assert_eq!(SaveFormat::from_name(".tif"), Some(SaveFormat::Tiff));
        assert_eq!(SaveFormat::from_name("gif"), None);
        assert_eq!(SaveFormat::from_path(Path::new("a/b.BMP")).unwrap(), SaveFormat::Bmp);
    }

    #[test]
    fn every_format_writes_a_decodable_file() {
        let formats = [
            SaveFormat::Png,
            SaveFormat::Jpeg,
            SaveFormat::Bmp,
            SaveFormat::Tga,
            SaveFormat::Tiff,
        ];
        for format in formats {
            let path = temp_path(format.extension());
            save_image_with(&gradient(4, 4), &path, format, 90).unwrap();
            let back = load_image(&path, MaxDimensions::NONE).unwrap();
            let _ = std::fs::remove_file(&path);
            assert_eq!(back.dimensions(), (4, 4), "{:?}", format);
        }
    }
}
