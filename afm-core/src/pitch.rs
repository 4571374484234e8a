//! # Pitch Estimation Module
//!
//! Estimates the dominant horizontal grating period of an intensity raster.
//!
//! ## Features
//! - Row-averaged 1-D magnitude spectra instead of a full 2-D transform
//! - Uniform row sampling capped at a configurable row count
//! - DC bin excluded from the peak search, so brightness offsets do not matter
//! - Log-parabolic interpolation for a sub-bin pitch estimate
//!
//! Only horizontal frequencies are analysed. A grating whose lines run
//! horizontally (period along y) is not detected.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::fft::{self, MagnitudeSpectrum, RowTransform, SpectrumWindow};
use crate::raster::Raster;

/// Narrowest raster the estimator accepts.
pub const MIN_WIDTH: usize = fft::MIN_TRANSFORM_LEN;

/// Parameters of the spectral pitch estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    /// Constant subtracted from every sample before the transform.
    pub intensity_offset: f32,
    /// Upper bound on the row count used to derive the sampling stride.
    pub max_sampled_rows: usize,
    pub window: SpectrumWindow,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            intensity_offset: 128.0,
            max_sampled_rows: 256,
            window: SpectrumWindow::Rectangular,
        }
    }
}

impl PitchConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.intensity_offset.is_finite() {
            return Err(AnalysisError::invalid("intensity offset must be finite"));
        }
        if self.max_sampled_rows == 0 {
            return Err(AnalysisError::invalid("max sampled rows must be at least 1"));
        }
        Ok(())
    }
}

/// Outcome of one pitch estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchEstimate {
    /// Strongest non-DC bin, `1 <= peak_bin < transform_len / 2`.
    pub peak_bin: usize,
    pub transform_len: usize,
    pub row_stride: usize,
    pub sampled_rows: usize,
    /// Grating period in pixels, `transform_len / peak_bin`.
    pub pitch_px: f32,
    /// Sub-bin period from interpolating around the peak, when available.
    pub refined_pitch_px: Option<f32>,
    pub spectrum: MagnitudeSpectrum,
}

impl PitchEstimate {
    /// Dominant spatial frequency in cycles per pixel.
    pub fn frequency(&self) -> f32 {
        self.peak_bin as f32 / self.transform_len as f32
    }

    /// Converts the pixel pitch into physical units.
    ///
    /// # Arguments
    /// * `nm_per_pixel` - Calibration factor of the scan
    pub fn physical_nm(&self, nm_per_pixel: f32) -> f32 {
        self.pitch_px * nm_per_pixel
    }
}

/// Row sampling stride: `floor(height / min(height, max_rows))`, at least 1.
pub fn row_stride(height: usize, max_rows: usize) -> usize {
    let rows = height.min(max_rows.max(1));
    if rows == 0 {
        return 1;
    }
    (height / rows).max(1)
}

/// Estimates the dominant horizontal period of `raster` in pixels.
///
/// Every `row_stride`-th row contributes the magnitudes of its first `N`
/// samples, `N` being the largest power of two not exceeding the width. The
/// pitch is `N / k*` for the strongest accumulated bin `k*`.
///
/// # Arguments
/// * `raster` - Intensity field to analyse
/// * `config` - Estimator parameters
///
/// # Returns
/// * `Ok(estimate)` - Peak bin, pitch and the accumulated spectrum
/// * `Err(InvalidInput)` - Raster narrower than 4 pixels or invalid config
/// * `Err(DegenerateSpectrum)` - Transform too short for a peak search
pub fn estimate_pitch(raster: &Raster, config: &PitchConfig) -> Result<PitchEstimate> {
    config.validate()?;
    if raster.width() < MIN_WIDTH {
        return Err(AnalysisError::invalid(format!(
            "raster width {} is below the minimum of {MIN_WIDTH} for spectral analysis",
            raster.width()
        )));
    }

    let transform_len = fft::transform_len(raster.width())?;
    let stride = row_stride(raster.height(), config.max_sampled_rows);
    let mut transform = RowTransform::new(transform_len, config.window);

    let (spectrum, sampled_rows) = (0..raster.height()).step_by(stride).fold(
        (MagnitudeSpectrum::new(transform_len), 0usize),
        |(mut spectrum, count), y| {
            spectrum.accumulate(transform.transform(raster.row(y), config.intensity_offset));
            (spectrum, count + 1)
        },
    );

    let peak_bin = spectrum.peak_bin()?;
    let pitch_px = transform_len as f32 / peak_bin as f32;
    let refined_pitch_px = refine_peak(spectrum.bins(), peak_bin)
        .map(|bin| transform_len as f32 / bin)
        .filter(|p| p.is_finite() && *p > 0.0);

    debug!(
        transform_len,
        stride, sampled_rows, peak_bin, pitch_px, "pitch estimated"
    );

    Ok(PitchEstimate {
        peak_bin,
        transform_len,
        row_stride: stride,
        sampled_rows,
        pitch_px,
        refined_pitch_px,
        spectrum,
    })
}

/// Refines a peak bin to sub-bin precision.
///
/// Fits a parabola through the log-magnitudes of the peak and its two
/// neighbours.
///
/// # Returns
/// * `Some(bin)` - Interpolated fractional bin
/// * `None` - Peak at the spectrum edge, next to DC, or a flat neighbourhood
pub fn refine_peak(magnitudes: &[f32], peak_bin: usize) -> Option<f32> {
    // The DC bin is never accumulated, so it cannot serve as a neighbour.
    if peak_bin < 2 || peak_bin + 1 >= magnitudes.len() {
        return None;
    }

    let y1 = magnitudes[peak_bin - 1].ln();
    let y2 = magnitudes[peak_bin].ln();
    let y3 = magnitudes[peak_bin + 1].ln();
    if !y1.is_finite() || !y2.is_finite() || !y3.is_finite() {
        return None;
    }

    let denominator = 2.0 * y2 - y1 - y3;
    if denominator.abs() < 1e-6 {
        return None;
    }

    let peak_shift = (y3 - y1) / (2.0 * denominator);
    let interpolated = peak_bin as f32 + peak_shift;
    interpolated.is_finite().then_some(interpolated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::stripe_grating;

    #[test]
    fn stride_caps_row_count() {
        assert_eq!(row_stride(1, 256), 1);
        assert_eq!(row_stride(300, 256), 1);
        assert_eq!(row_stride(512, 256), 2);
        assert_eq!(row_stride(1000, 256), 3);
        assert_eq!(row_stride(1000, 0), 1000);
    }

    #[test]
    fn sampled_row_count_follows_stride() {
        let raster = stripe_grating(64, 1000, 8.0, 40.0, 128.0).unwrap();
        let estimate = estimate_pitch(&raster, &PitchConfig::default()).unwrap();
        assert_eq!(estimate.row_stride, 3);
        assert_eq!(estimate.sampled_rows, 334);
    }

    #[test]
    fn reports_period_of_a_stripe_grating() {
        let raster = stripe_grating(128, 32, 8.0, 50.0, 120.0).unwrap();
        let estimate = estimate_pitch(&raster, &PitchConfig::default()).unwrap();

        assert_eq!(estimate.transform_len, 128);
        assert_eq!(estimate.peak_bin, 16);
        assert_eq!(estimate.pitch_px, 8.0);
        assert!((estimate.frequency() - 0.125).abs() < 1e-6);
        assert_eq!(estimate.physical_nm(12.5), 100.0);
    }

    #[test]
    fn refinement_lands_between_bins_for_off_grid_periods() {
        // 128 / 10.5 ≈ 12.19 px: energy splits between bins 10 and 11.
        let raster = stripe_grating(128, 16, 128.0 / 10.5, 50.0, 128.0).unwrap();
        let config = PitchConfig {
            window: SpectrumWindow::Hann,
            ..PitchConfig::default()
        };
        let estimate = estimate_pitch(&raster, &config).unwrap();

        assert!(estimate.peak_bin == 10 || estimate.peak_bin == 11);
        let refined = estimate.refined_pitch_px.unwrap();
        assert!((refined - 128.0 / 10.5).abs() < 0.4, "refined {refined}");
    }

    #[test]
    fn refine_peak_rejects_edges() {
        let mags = [0.0, 1.0, 3.0, 1.0];
        assert_eq!(refine_peak(&mags, 1), None);
        assert_eq!(refine_peak(&mags, 3), None);
        let centred = refine_peak(&mags, 2).unwrap();
        assert!((centred - 2.0).abs() < 1e-6);
    }

    #[test]
    fn narrow_rasters_are_invalid_input() {
        let raster = Raster::from_vec(3, 5, vec![10.0; 15]).unwrap();
        assert!(matches!(
            estimate_pitch(&raster, &PitchConfig::default()),
            Err(AnalysisError::InvalidInput { .. })
        ));
    }

    #[test]
    fn zero_row_budget_is_rejected() {
        let raster = stripe_grating(16, 4, 4.0, 20.0, 128.0).unwrap();
        let config = PitchConfig {
            max_sampled_rows: 0,
            ..PitchConfig::default()
        };
        assert!(estimate_pitch(&raster, &config).is_err());
    }
}
