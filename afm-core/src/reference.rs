//! # Reference Grating Module
//!
//! Compares a measured physical pitch against the target pitches a sample was
//! fabricated for, the way a tuner compares a frequency against the nearest
//! note.
//!
//! ## Features
//! - Absolute deviation in nm for every target
//! - Relative deviation in percent (positive = measured pitch is longer)
//! - Nearest-target lookup

use serde::{Deserialize, Serialize};

/// Target pitches of the surface-relief gratings the tool was built around.
pub const DEFAULT_REFERENCE_PITCHES_NM: [f32; 3] = [623.0, 668.0, 717.0];

/// Deviation of a measured pitch from one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceComparison {
    pub target_nm: f32,
    /// `|measured - target|` in nm.
    pub deviation_nm: f32,
    /// `(measured - target) / target * 100`.
    pub relative_percent: f32,
}

/// Calculates the deviation from a target pitch in percent.
///
/// # Arguments
/// * `pitch_nm` - Measured pitch
/// * `target_nm` - Target pitch
///
/// # Returns
/// * Signed deviation (positive = longer than target, negative = shorter)
pub fn relative_deviation_percent(pitch_nm: f32, target_nm: f32) -> f32 {
    (pitch_nm - target_nm) / target_nm * 100.0
}

/// Compares a measured pitch against every positive target.
///
/// Non-positive or non-finite targets are skipped.
pub fn compare_references(pitch_nm: f32, targets_nm: &[f32]) -> Vec<ReferenceComparison> {
    targets_nm
        .iter()
        .filter(|t| t.is_finite() && **t > 0.0)
        .map(|&target_nm| ReferenceComparison {
            target_nm,
            deviation_nm: (pitch_nm - target_nm).abs(),
            relative_percent: relative_deviation_percent(pitch_nm, target_nm),
        })
        .collect()
}

/// Finds the target closest to the measured pitch.
///
/// # Returns
/// * `Some(comparison)` - Smallest absolute deviation, first one on ties
/// * `None` - No comparisons were given
pub fn nearest_reference(comparisons: &[ReferenceComparison]) -> Option<&ReferenceComparison> {
    comparisons.iter().reduce(|best, candidate| {
        if candidate.deviation_nm < best.deviation_nm {
            candidate
        } else {
            best
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_against_every_target() {
        let comparisons = compare_references(680.0, &DEFAULT_REFERENCE_PITCHES_NM);
        let deviations: Vec<f32> = comparisons.iter().map(|c| c.deviation_nm).collect();
        assert_eq!(deviations, vec![57.0, 12.0, 37.0]);

        let nearest = nearest_reference(&comparisons).unwrap();
        assert_eq!(nearest.target_nm, 668.0);
        assert!((nearest.relative_percent - 12.0 / 668.0 * 100.0).abs() < 1e-4);
    }

    #[test]
    fn skips_invalid_targets_and_handles_empty() {
        let comparisons = compare_references(500.0, &[0.0, -3.0, f32::NAN, 400.0]);
        assert_eq!(comparisons.len(), 1);
        assert_eq!(comparisons[0].relative_percent, 25.0);

        assert!(nearest_reference(&[]).is_none());
    }
}
