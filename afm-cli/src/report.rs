//! # Report Module
//!
//! Flattens an [`AnalysisResult`] into the JSON document written by the CLI.
//! The defect mask itself is left out; the overlay images carry it.

use std::path::Path;

use afm_core::{AnalysisResult, ReferenceComparison};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Summary of one analysed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub source: String,
    pub width: usize,
    pub height: usize,
    pub transform_len: usize,
    pub sampled_rows: usize,
    pub peak_bin: usize,
    pub pitch_px: f32,
    pub refined_pitch_px: Option<f32>,
    pub nm_per_pixel: f32,
    pub pitch_nm: f32,
    pub flagged_pixels: usize,
    pub flagged_fraction: f32,
    pub nearest_reference: Option<ReferenceComparison>,
    pub references: Vec<ReferenceComparison>,
}

impl AnalysisReport {
    pub fn new(source: &Path, result: &AnalysisResult, nm_per_pixel: f32) -> Self {
        Self {
            source: source.display().to_string(),
            width: result.width,
            height: result.height,
            transform_len: result.pitch.transform_len,
            sampled_rows: result.pitch.sampled_rows,
            peak_bin: result.pitch.peak_bin,
            pitch_px: result.pitch.pitch_px,
            refined_pitch_px: result.pitch.refined_pitch_px,
            nm_per_pixel,
            pitch_nm: result.pitch_nm,
            flagged_pixels: result.defects.flagged_count(),
            flagged_fraction: result.defects.flagged_fraction(),
            nearest_reference: result.nearest_reference().cloned(),
            references: result.references.clone(),
        }
    }

    /// One human-readable line for terminal output.
    pub fn summary_line(&self) -> String {
        let nearest = match &self.nearest_reference {
            Some(r) => format!(
                ", nearest target {:.0} nm ({:+.1}%)",
                r.target_nm, r.relative_percent
            ),
            None => String::new(),
        };
        format!(
            "{}: pitch {:.1} nm ({:.2} px, bin {}/{}), {} defect pixels ({:.2}%){}",
            self.source,
            self.pitch_nm,
            self.pitch_px,
            self.peak_bin,
            self.transform_len,
            self.flagged_pixels,
            self.flagged_fraction * 100.0,
            nearest
        )
    }
}

/// Outcome of one file in a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Writes any serializable value as pretty JSON.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use afm_core::synthetic::stripe_grating;
    use afm_core::{AnalysisConfig, analyze_raster};

    #[test]
    fn report_flattens_the_result() {
        let raster = stripe_grating(256, 32, 64.0, 50.0, 128.0).unwrap();
        let config = AnalysisConfig::default();
        let result = analyze_raster(&raster, &config).unwrap();
        let report = AnalysisReport::new(Path::new("sample.png"), &result, config.nm_per_pixel);

        assert_eq!(report.pitch_px, 64.0);
        assert_eq!(report.pitch_nm, 640.0);
        assert_eq!(report.nearest_reference.as_ref().unwrap().target_nm, 623.0);
        assert!(report.summary_line().starts_with("sample.png: pitch 640.0 nm"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["peak_bin"], 4);
        assert_eq!(json["source"], "sample.png");
    }

    #[test]
    fn batch_entries_omit_empty_fields() {
        let entry = BatchEntry {
            source: "broken.png".into(),
            report: None,
            error: Some("failed to decode".into()),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("report").is_none());
        assert_eq!(json["error"], "failed to decode");
    }
}
