// ============================================================================
// PIXEL FILTERS: per-pixel compute contract and the full-buffer driver
// ============================================================================

use image::Rgb;
use rayon::prelude::*;

use crate::canvas::PixelBuffer;
use crate::error::{EditError, Result};

use super::adjustments::Filter;

/// A pixel-wise transform.
///
/// Implementors override [`compute_pixel`](PixelFilter::compute_pixel); the
/// provided [`apply`](PixelFilter::apply) walks every coordinate of the source
/// and assembles a new buffer. The default compute step is the identity, so a
/// filter that overrides nothing is a no-op.
pub trait PixelFilter: Send + Sync {
    /// Output pixel for `(x, y)` of `source`.
    #[inline]
    fn compute_pixel(&self, source: &PixelBuffer, x: u32, y: u32) -> Rgb<u8> {
        source.pixel(x, y)
    }

    /// Run the filter over `source`, returning a new buffer.
    /// Fails with `InvalidState` on an empty buffer.
    fn apply(&self, source: &PixelBuffer) -> Result<PixelBuffer> {
        apply_per_pixel(source, |x, y| self.compute_pixel(source, x, y))
    }
}

/// Row-parallel driver shared by every filter.
fn apply_per_pixel<F>(source: &PixelBuffer, compute: F) -> Result<PixelBuffer>
where
    F: Fn(u32, u32) -> Rgb<u8> + Sync,
{
    if source.is_empty() {
        return Err(EditError::InvalidState(format!(
            "cannot filter an empty {}x{} buffer",
            source.width(),
            source.height()
        )));
    }
    let (w, h) = source.dimensions();
    let stride = w as usize * 3;
    let mut dst_raw = vec![0u8; stride * h as usize];

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        for x in 0..w as usize {
            let Rgb(px) = compute(x as u32, y as u32);
            row_out[x * 3..x * 3 + 3].copy_from_slice(&px);
        }
    });

    PixelBuffer::from_raw(w, h, dst_raw)
        .ok_or_else(|| EditError::InvalidState("filter produced a malformed buffer".to_string()))
}

/// Apply `filters` to `source` in order. An empty chain yields a copy.
pub fn replay(source: &PixelBuffer, filters: &[Filter]) -> Result<PixelBuffer> {
    let mut current = source.clone();
    for filter in filters {
        current = filter.apply(&current)?;
    }
    Ok(current)
}
