use std::path::{Path, PathBuf};

use filterlab::io::{self, MaxDimensions};
use filterlab::PixelBuffer;
use image::{Rgb, RgbImage};

/// A file under the system temp dir, removed on drop.
pub struct TempFile(PathBuf);

impl TempFile {
    pub fn new(ext: &str) -> Self {
        let name = format!("filterlab-it-{}.{}", uuid::Uuid::new_v4(), ext);
        TempFile(std::env::temp_dir().join(name))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// The 2x2 image used throughout the filter walkthrough.
pub fn scenario_image() -> PixelBuffer {
    PixelBuffer::from_rows(&[
        vec![[200, 100, 50], [10, 10, 10]],
        vec![[0, 0, 0], [255, 255, 255]],
    ])
    .expect("rows are rectangular")
}

pub fn uniform_image(width: u32, height: u32, rgb: [u8; 3]) -> PixelBuffer {
    PixelBuffer::from_rgb_image(RgbImage::from_pixel(width, height, Rgb(rgb)))
}

/// Write `buffer` as a PNG temp file.
pub fn png_fixture(buffer: &PixelBuffer) -> TempFile {
    let file = TempFile::new("png");
    io::save_image(buffer, file.path()).expect("fixture png written");
    file
}

pub fn read_back(path: &Path) -> PixelBuffer {
    io::load_image(path, MaxDimensions::NONE).expect("saved file decodes")
}
