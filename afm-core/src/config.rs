//! # Configuration Module
//!
//! All tunable parameters of one analysis run. Every field has a default, so a
//! partial JSON document only needs to name what it changes.

use serde::{Deserialize, Serialize};

use crate::defect::DefectConfig;
use crate::error::{AnalysisError, Result};
use crate::overlay::OverlayStyle;
use crate::pitch::PitchConfig;
use crate::reference::DEFAULT_REFERENCE_PITCHES_NM;

/// Complete parameter set for [`crate::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Calibration of the scan, nanometres per pixel.
    pub nm_per_pixel: f32,
    pub pitch: PitchConfig,
    pub defect: DefectConfig,
    pub overlay: OverlayStyle,
    /// Target pitches the physical pitch is compared against.
    pub reference_pitches_nm: Vec<f32>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            nm_per_pixel: 10.0,
            pitch: PitchConfig::default(),
            defect: DefectConfig::default(),
            overlay: OverlayStyle::default(),
            reference_pitches_nm: DEFAULT_REFERENCE_PITCHES_NM.to_vec(),
        }
    }
}

impl AnalysisConfig {
    /// Checks every parameter range.
    ///
    /// # Returns
    /// * `Err(InvalidInput)` - The first out-of-range parameter found
    pub fn validate(&self) -> Result<()> {
        if !(self.nm_per_pixel.is_finite() && self.nm_per_pixel > 0.0) {
            return Err(AnalysisError::invalid(format!(
                "nm per pixel must be positive, got {}",
                self.nm_per_pixel
            )));
        }
        self.pitch.validate()?;
        self.defect.validate()?;
        self.overlay.validate()
    }
}
