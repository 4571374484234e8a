//! # Defect Overlay
//!
//! Renders a defect mask for display, either tinted over the source image or
//! as a bare binary map.

use serde::{Deserialize, Serialize};

use crate::defect::DefectMask;
use crate::error::{AnalysisError, Result};

/// How flagged pixels are drawn over the source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub color: [u8; 3],
    /// Blend weight of `color`, 0 leaves the image untouched, 1 paints over it.
    pub opacity: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: [255, 0, 0],
            opacity: 0.35,
        }
    }
}

impl OverlayStyle {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(AnalysisError::invalid(format!(
                "overlay opacity must lie in [0, 1], got {}",
                self.opacity
            )));
        }
        Ok(())
    }
}

fn check_dimensions(len: usize, mask: &DefectMask) -> Result<()> {
    let expected = mask.width() * mask.height() * 4;
    if len != expected {
        return Err(AnalysisError::invalid(format!(
            "rgba buffer holds {len} bytes, mask needs {expected}"
        )));
    }
    Ok(())
}

/// Tints flagged pixels of an RGBA image.
///
/// Unflagged pixels keep their colour. Every output pixel is opaque.
///
/// # Arguments
/// * `rgba` - Source image, same dimensions as the mask
/// * `mask` - Defect flags
/// * `style` - Tint colour and opacity
pub fn render_overlay(rgba: &[u8], mask: &DefectMask, style: &OverlayStyle) -> Result<Vec<u8>> {
    style.validate()?;
    check_dimensions(rgba.len(), mask)?;

    let alpha = style.opacity;
    let blend =
        |base: u8, tint: u8| (base as f32 * (1.0 - alpha) + tint as f32 * alpha).round() as u8;

    let mut out = Vec::with_capacity(rgba.len());
    for (px, &flagged) in rgba.chunks_exact(4).zip(mask.flags()) {
        if flagged {
            out.extend_from_slice(&[
                blend(px[0], style.color[0]),
                blend(px[1], style.color[1]),
                blend(px[2], style.color[2]),
                255,
            ]);
        } else {
            out.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
    }
    Ok(out)
}

/// Binary map: flagged pixels in `color`, everything else black, all opaque.
pub fn mask_to_rgba(mask: &DefectMask, color: [u8; 3]) -> Vec<u8> {
    mask.flags()
        .iter()
        .flat_map(|&flagged| {
            let [r, g, b] = if flagged { color } else { [0, 0, 0] };
            [r, g, b, 255]
        })
        .collect()
}
