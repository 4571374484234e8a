//! # Grayscale Reducer
//!
//! Collapses decoded pixel buffers into the single-channel intensity field the
//! estimators work on.

use crate::error::{AnalysisError, Result};
use crate::raster::Raster;

const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Luminance-weighted intensity of one colour sample.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32
}

/// Converts an interleaved RGBA buffer into an intensity raster.
///
/// Alpha is ignored.
///
/// # Arguments
/// * `rgba` - Interleaved R,G,B,A samples, `4 * width * height` bytes
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
///
/// # Returns
/// * `Ok(raster)` - One sample per pixel
/// * `Err(InvalidInput)` - Zero dimension or buffer length mismatch
pub fn rgba_to_raster(rgba: &[u8], width: usize, height: usize) -> Result<Raster> {
    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| AnalysisError::invalid("rgba size overflows usize"))?;
    if rgba.len() != expected {
        return Err(AnalysisError::invalid(format!(
            "rgba buffer holds {} bytes, expected {expected} for {width}x{height}",
            rgba.len()
        )));
    }

    let data = rgba
        .chunks_exact(4)
        .map(|px| luminance(px[0], px[1], px[2]))
        .collect();
    Raster::from_vec(width, height, data)
}

/// Wraps an 8-bit single-channel buffer as a raster.
pub fn gray8_to_raster(gray: &[u8], width: usize, height: usize) -> Result<Raster> {
    Raster::from_vec(width, height, gray.iter().map(|&g| g as f32).collect())
}
