//! # Synthetic Gratings
//!
//! Generates AFM-like test images with a known pitch: straight vertical
//! stripes for exact checks, and circular surface-relief gratings with noise,
//! a centre "mountain" and random blobs for realistic sample files.

use std::f32::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::raster::Raster;

/// Vertical stripes `mean + amplitude * sin(2πx / period)`.
///
/// Every row is identical, so the period lies entirely along x.
pub fn stripe_grating(
    width: usize,
    height: usize,
    period: f32,
    amplitude: f32,
    mean: f32,
) -> Result<Raster> {
    if !(period.is_finite() && period > 0.0) {
        return Err(AnalysisError::invalid(format!(
            "grating period must be positive, got {period}"
        )));
    }
    Raster::from_fn(width, height, |x, _| {
        mean + amplitude * (2.0 * PI * x as f32 / period).sin()
    })
}

/// Parameters of a circular surface-relief grating image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircularGrating {
    /// Side length of the square image in pixels.
    pub size: usize,
    pub pitch_px: f32,
    /// Standard deviation of the additive Gaussian noise.
    pub noise_level: f32,
    /// Adds the raised centre feature.
    pub center_defect: bool,
    /// Number of random Gaussian blobs.
    pub blob_count: usize,
    pub seed: u64,
}

impl Default for CircularGrating {
    fn default() -> Self {
        Self {
            size: 512,
            pitch_px: 68.0,
            noise_level: 8.0,
            center_defect: true,
            blob_count: 5,
            seed: 0,
        }
    }
}

const RING_MEAN: f32 = 128.0;
const RING_AMPLITUDE: f32 = 50.0;
const CENTER_HEIGHT: f32 = 40.0;
const CENTER_RADIUS: f32 = 30.0;

struct Blob {
    cx: f32,
    cy: f32,
    radius: f32,
    height: f32,
}

impl CircularGrating {
    /// Renders the grating, clipped to 0–255 and truncated to whole levels.
    ///
    /// The same parameters always produce the same image.
    pub fn generate(&self) -> Result<Raster> {
        if self.size < 2 {
            return Err(AnalysisError::invalid("synthetic image size must be at least 2"));
        }
        if !(self.pitch_px.is_finite() && self.pitch_px > 0.0) {
            return Err(AnalysisError::invalid("grating pitch must be positive"));
        }
        if !(self.noise_level.is_finite() && self.noise_level >= 0.0) {
            return Err(AnalysisError::invalid("noise level must be non-negative"));
        }

        let size = self.size;
        let half = size as f32 / 2.0;
        // Coordinates span [-size/2, size/2] inclusive, like a linspace.
        let step = size as f32 / (size - 1) as f32;
        let coord = |i: usize| -half + i as f32 * step;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut data: Vec<f32> = (0..size * size)
            .map(|idx| {
                let (x, y) = (coord(idx % size), coord(idx / size));
                let r = (x * x + y * y).sqrt();
                let noise: f32 = rng.sample(StandardNormal);
                RING_MEAN
                    + RING_AMPLITUDE * (2.0 * PI * r / self.pitch_px).sin()
                    + noise * self.noise_level
            })
            .collect();

        let quarter = size / 4;
        let upper = (3 * quarter).max(quarter + 1);
        let blobs: Vec<Blob> = (0..self.blob_count)
            .map(|_| Blob {
                cx: rng.gen_range(quarter..upper) as f32 - half,
                cy: rng.gen_range(quarter..upper) as f32 - half,
                radius: rng.gen_range(10..30i32) as f32,
                height: rng.gen_range(-30..30i32) as f32,
            })
            .collect();

        for (idx, value) in data.iter_mut().enumerate() {
            let (x, y) = (coord(idx % size), coord(idx / size));
            if self.center_defect {
                let r2 = x * x + y * y;
                *value += CENTER_HEIGHT * (-r2 / (CENTER_RADIUS * CENTER_RADIUS)).exp();
            }
            for blob in &blobs {
                let d2 = (x - blob.cx).powi(2) + (y - blob.cy).powi(2);
                *value += blob.height * (-d2 / (blob.radius * blob.radius)).exp();
            }
            *value = value.clamp(0.0, 255.0).trunc();
        }

        Raster::from_vec(size, size, data)
    }
}
