//! # Defect Detection Module
//!
//! Flags pixels that stand out from their neighbourhood, a coarse stand-in
//! for a trained detector of dust, scratches and deformation.
//!
//! ## Features
//! - Square local-mean window with replicate-edge clamping
//! - Separable sliding running sums, O(W·H) regardless of window size
//! - Rows scanned in parallel with rayon

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::raster::Raster;

/// Largest accepted window half-width.
pub const MAX_HALF_WINDOW: usize = 1024;

/// Parameters of the local-contrast detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefectConfig {
    /// Window half-width `r`; the window spans `(2r+1) x (2r+1)` samples.
    pub half_window: usize,
    /// A pixel is a defect when `|I - local_mean| > threshold`.
    pub threshold: f32,
}

impl Default for DefectConfig {
    fn default() -> Self {
        Self {
            half_window: 9,
            threshold: 25.0,
        }
    }
}

impl DefectConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(AnalysisError::invalid(format!(
                "defect threshold must be finite and non-negative, got {}",
                self.threshold
            )));
        }
        window_area(self.half_window)?;
        Ok(())
    }

    pub fn window_len(&self) -> usize {
        self.half_window.saturating_mul(2).saturating_add(1)
    }
}

/// Number of samples in a `(2r+1) x (2r+1)` window.
///
/// # Returns
/// * `Ok(n)` - Window area
/// * `Err(InvalidInput)` - `r` exceeds [`MAX_HALF_WINDOW`]
fn window_area(half_window: usize) -> Result<usize> {
    if half_window > MAX_HALF_WINDOW {
        return Err(AnalysisError::invalid(format!(
            "defect window half-width must be at most {MAX_HALF_WINDOW}, got {half_window}"
        )));
    }
    let side = 2 * half_window + 1;
    Ok(side * side)
}

#[derive(Deserialize)]
struct RawDefectMask {
    width: usize,
    height: usize,
    flags: Vec<bool>,
}

impl TryFrom<RawDefectMask> for DefectMask {
    type Error = AnalysisError;

    fn try_from(raw: RawDefectMask) -> Result<Self> {
        if raw.width.checked_mul(raw.height) != Some(raw.flags.len()) {
            return Err(AnalysisError::invalid(format!(
                "defect mask holds {} flags, expected {}x{}",
                raw.flags.len(),
                raw.width,
                raw.height
            )));
        }
        Ok(Self {
            width: raw.width,
            height: raw.height,
            flags: raw.flags,
        })
    }
}

/// Per-pixel defect flags with the dimensions of the source raster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDefectMask")]
pub struct DefectMask {
    width: usize,
    height: usize,
    flags: Vec<bool>,
}

impl DefectMask {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    pub fn is_defect(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.flags[y * self.width + x]
    }

    pub fn flagged_count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    /// Share of flagged pixels in `[0, 1]`.
    pub fn flagged_fraction(&self) -> f32 {
        self.flagged_count() as f32 / self.flags.len() as f32
    }
}

#[inline]
fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Sum over `[x - r, x + r]` of each row, edges replicated.
fn horizontal_sums(raster: &Raster, r: usize) -> Vec<f64> {
    let w = raster.width();
    let r = r as isize;
    let mut sums = vec![0.0f64; w * raster.height()];

    sums.par_chunks_mut(w).enumerate().for_each(|(y, out)| {
        let row = raster.row(y);
        let mut acc: f64 = (-r..=r).map(|dx| row[clamp_index(dx, w)] as f64).sum();
        for (x, slot) in out.iter_mut().enumerate() {
            *slot = acc;
            let xi = x as isize;
            acc += row[clamp_index(xi + r + 1, w)] as f64 - row[clamp_index(xi - r, w)] as f64;
        }
    });
    sums
}

/// Mean of the clamped `(2r+1) x (2r+1)` window around every pixel.
///
/// Equivalent to averaging `raster.clamped(x + dx, y + dy)` over the window,
/// up to floating-point rounding.
///
/// # Returns
/// * `Ok(means)` - One mean per pixel, row-major
/// * `Err(InvalidInput)` - `half_window` exceeds [`MAX_HALF_WINDOW`]
pub fn local_means(raster: &Raster, half_window: usize) -> Result<Vec<f64>> {
    let (w, h) = (raster.width(), raster.height());
    let count = window_area(half_window)? as f64;
    let r = half_window as isize;
    let sums = horizontal_sums(raster, half_window);
    let row_of = |y: isize| {
        let start = clamp_index(y, h) * w;
        &sums[start..start + w]
    };

    let mut columns = vec![0.0f64; w];
    for dy in -r..=r {
        for (c, v) in columns.iter_mut().zip(row_of(dy)) {
            *c += v;
        }
    }

    let mut means = vec![0.0f64; w * h];
    for (y, out) in means.chunks_mut(w).enumerate() {
        for (m, c) in out.iter_mut().zip(&columns) {
            *m = c / count;
        }
        let yi = y as isize;
        let (add, sub) = (row_of(yi + r + 1), row_of(yi - r));
        for ((c, a), s) in columns.iter_mut().zip(add).zip(sub) {
            *c += a - s;
        }
    }
    Ok(means)
}

/// Flags pixels deviating from their local mean by more than the threshold.
///
/// # Arguments
/// * `raster` - Intensity field to scan
/// * `config` - Window half-width and threshold
///
/// # Returns
/// * `Ok(mask)` - One flag per pixel
/// * `Err(InvalidInput)` - Negative or non-finite threshold, oversized window
pub fn detect_defects(raster: &Raster, config: &DefectConfig) -> Result<DefectMask> {
    config.validate()?;

    let w = raster.width();
    let means = local_means(raster, config.half_window)?;
    let threshold = config.threshold as f64;

    let mut flags = vec![false; raster.data().len()];
    flags
        .par_chunks_mut(w)
        .zip(means.par_chunks(w))
        .enumerate()
        .for_each(|(y, (out, mean_row))| {
            for ((flag, &value), &mean) in out.iter_mut().zip(raster.row(y)).zip(mean_row) {
                *flag = (value as f64 - mean).abs() > threshold;
            }
        });

    let mask = DefectMask {
        width: w,
        height: raster.height(),
        flags,
    };
    debug!(
        window = config.window_len(),
        threshold = config.threshold,
        flagged = mask.flagged_count(),
        "defect scan complete"
    );
    Ok(mask)
}
