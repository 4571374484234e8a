// afm-core/src/lib.rs

//! The core logic for AFM grating image quality checks.
//! This crate is responsible for grayscale reduction, spectral pitch
//! estimation and local-contrast defect detection. It is completely headless
//! and contains no image codec or I/O code.

pub mod config;
pub mod defect;
pub mod error;
pub mod fft;
pub mod gray;
pub mod overlay;
pub mod pitch;
pub mod raster;
pub mod reference;
pub mod synthetic;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use config::AnalysisConfig;
pub use defect::{detect_defects, DefectConfig, DefectMask};
pub use error::{AnalysisError, Result};
pub use pitch::{estimate_pitch, PitchConfig, PitchEstimate};
pub use raster::Raster;
pub use reference::ReferenceComparison;

/// Represents the result of analysing a single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub width: usize,
    pub height: usize,
    /// Dominant horizontal period and the spectrum it was read from.
    pub pitch: PitchEstimate,
    /// `pitch.pitch_px` scaled by the configured nm per pixel.
    pub pitch_nm: f32,
    /// Deviation from every configured reference pitch.
    pub references: Vec<ReferenceComparison>,
    pub defects: DefectMask,
}

impl AnalysisResult {
    /// The reference pitch closest to the measurement.
    pub fn nearest_reference(&self) -> Option<&ReferenceComparison> {
        reference::nearest_reference(&self.references)
    }
}

/// Analyses an interleaved RGBA image.
///
/// # Arguments
/// * `rgba` - Decoded pixels, `4 * width * height` bytes
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `config` - Analysis parameters
///
/// # Returns
/// * `Ok(result)` - Pitch estimate and defect mask together
/// * `Err(e)` - The image or configuration cannot be analysed
pub fn analyze(
    rgba: &[u8],
    width: usize,
    height: usize,
    config: &AnalysisConfig,
) -> Result<AnalysisResult> {
    let raster = gray::rgba_to_raster(rgba, width, height)?;
    analyze_raster(&raster, config)
}

/// Runs the pitch estimator and the defect detector on one raster.
pub fn analyze_raster(raster: &Raster, config: &AnalysisConfig) -> Result<AnalysisResult> {
    config.validate()?;

    let pitch = estimate_pitch(raster, &config.pitch)?;
    let defects = detect_defects(raster, &config.defect)?;
    let pitch_nm = pitch.physical_nm(config.nm_per_pixel);
    let references = reference::compare_references(pitch_nm, &config.reference_pitches_nm);

    debug!(
        width = raster.width(),
        height = raster.height(),
        pitch_nm,
        flagged = defects.flagged_count(),
        "analysis complete"
    );

    Ok(AnalysisResult {
        width: raster.width(),
        height: raster.height(),
        pitch,
        pitch_nm,
        references,
        defects,
    })
}
