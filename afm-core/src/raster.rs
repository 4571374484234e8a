//! # Raster Module
//!
//! A single-channel intensity field derived once per input image. The
//! dimensions are fixed at creation and the samples are never mutated, so a
//! raster can be shared freely between the pitch estimator and the defect
//! detector.

use crate::error::{AnalysisError, Result};

/// Row-major grid of intensity samples on the 0–255 scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Raster {
    /// Wraps an existing sample buffer.
    ///
    /// # Errors
    /// * `InvalidInput` if either dimension is zero or `data.len() != width * height`
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(AnalysisError::invalid(format!(
                "raster dimensions {width}x{height} must be non-zero"
            )));
        }
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| AnalysisError::invalid("raster size overflows usize"))?;
        if data.len() != expected {
            return Err(AnalysisError::invalid(format!(
                "raster buffer holds {} samples, expected {expected}",
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Builds a raster by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> f32,
    ) -> Result<Self> {
        let mut data = Vec::with_capacity(width.saturating_mul(height));
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::from_vec(width, height, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, y: usize) -> &[f32] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Sample at `(x, y)` with out-of-range coordinates clamped to the nearest edge.
    pub fn clamped(&self, x: isize, y: isize) -> f32 {
        let xx = x.clamp(0, self.width as isize - 1) as usize;
        let yy = y.clamp(0, self.height as isize - 1) as usize;
        self.data[yy * self.width + xx]
    }

    /// Quantises the samples back to 8-bit gray, rounding and clipping to 0–255.
    pub fn to_gray8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|&v| v.round().clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Expands the samples to an opaque interleaved RGBA buffer.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.to_gray8()
            .into_iter()
            .flat_map(|g| [g, g, g, 255])
            .collect()
    }
}
