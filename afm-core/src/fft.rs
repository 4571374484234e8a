//! # Fast Fourier Transform (FFT) Module
//!
//! Row-wise spectral analysis for grating images. Each sampled image row is
//! treated as a real 1-D signal, transformed with RustFFT, and its magnitude
//! spectrum is summed into a shared accumulator.
//!
//! ## Features
//! - Power-of-two transform length selection
//! - Constant-offset centring of 0–255 intensities
//! - Optional Hann windowing for reduced spectral leakage
//! - Magnitude accumulation that never touches the DC bin

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner, Length};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Smallest transform length with a non-empty peak search range `[1, N/2)`.
pub const MIN_TRANSFORM_LEN: usize = 4;

/// Window applied to each row before the transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectrumWindow {
    /// Plain truncation, the behaviour of the original estimator.
    #[default]
    Rectangular,
    Hann,
}

/// Largest power of two not exceeding `width`, or 0 for an empty row.
pub fn largest_power_of_two(width: usize) -> usize {
    if width == 0 {
        0
    } else {
        1 << (usize::BITS - 1 - width.leading_zeros())
    }
}

/// Chooses the transform length for rows of `width` samples.
///
/// # Returns
/// * `Ok(n)` - Largest power of two `<= width`, at least 4
/// * `Err(DegenerateSpectrum)` - The row is too short for a peak search
pub fn transform_len(width: usize) -> Result<usize> {
    let n = largest_power_of_two(width);
    if n < MIN_TRANSFORM_LEN {
        return Err(AnalysisError::DegenerateSpectrum { transform_len: n });
    }
    Ok(n)
}

/// Applies a Hann window to the input buffer to reduce spectral leakage.
///
/// The Hann window tapers the signal to zero at the edges.
///
/// # Arguments
/// * `buffer` - Samples to window (modified in-place)
fn apply_hann_window(buffer: &mut [Complex<f32>]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    let n_minus_1 = (n - 1) as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let multiplier = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos());
        sample.re *= multiplier;
    }
}

/// Magnitude spectrum summed over many rows.
///
/// Holds `N/2` bins. Bin 0 (DC) stays at zero and is excluded from the peak
/// search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeSpectrum {
    transform_len: usize,
    bins: Vec<f32>,
}

impl MagnitudeSpectrum {
    pub fn new(transform_len: usize) -> Self {
        Self {
            transform_len,
            bins: vec![0.0; transform_len / 2],
        }
    }

    pub fn transform_len(&self) -> usize {
        self.transform_len
    }

    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    /// Adds `|X_k|` for every `k` in `[1, N/2)` of one transformed row.
    pub fn accumulate(&mut self, spectrum: &[Complex<f32>]) {
        for (k, bin) in self.bins.iter_mut().enumerate().skip(1) {
            // .norm() is sqrt(re^2 + im^2)
            *bin += spectrum[k].norm();
        }
    }

    /// Index of the strongest non-DC bin.
    ///
    /// Uses a strict `>` so the lowest index wins exact ties.
    ///
    /// # Returns
    /// * `Ok(k)` - Peak bin with `1 <= k < N/2`
    /// * `Err(DegenerateSpectrum)` - No bin besides DC exists
    pub fn peak_bin(&self) -> Result<usize> {
        if self.bins.len() < 2 {
            return Err(AnalysisError::DegenerateSpectrum {
                transform_len: self.transform_len,
            });
        }

        let mut kmax = 1;
        let mut vmax = f32::NEG_INFINITY;
        for (k, &value) in self.bins.iter().enumerate().skip(1) {
            if value > vmax {
                vmax = value;
                kmax = k;
            }
        }
        Ok(kmax)
    }
}

/// A planned forward FFT reused across every row of one analysis.
pub struct RowTransform {
    fft: Arc<dyn Fft<f32>>,
    window: SpectrumWindow,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl RowTransform {
    pub fn new(transform_len: usize, window: SpectrumWindow) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(transform_len);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];
        Self {
            fft,
            window,
            buffer: Vec::with_capacity(transform_len),
            scratch,
        }
    }

    pub fn len(&self) -> usize {
        self.fft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fft.len() == 0
    }

    /// Performs a forward FFT on the first `N` samples of `row`.
    ///
    /// Each sample has `offset` subtracted before the transform so the
    /// absolute brightness does not swamp the low bins.
    ///
    /// # Panics
    /// * If `row` is shorter than the transform length
    pub fn transform(&mut self, row: &[f32], offset: f32) -> &[Complex<f32>] {
        let n = self.fft.len();
        self.buffer.clear();
        self.buffer
            .extend(row[..n].iter().map(|&v| Complex { re: v - offset, im: 0.0 }));

        if self.window == SpectrumWindow::Hann {
            apply_hann_window(&mut self.buffer);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);
        &self.buffer
    }
}
