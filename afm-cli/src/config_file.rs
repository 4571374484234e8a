//! # Config File Module
//!
//! Loads and saves [`AnalysisConfig`] as pretty-printed JSON so a calibration
//! can be reused across sessions.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use afm_core::AnalysisConfig;
use anyhow::{Context, Result};

/// Saves an analysis configuration to a JSON file.
///
/// # Arguments
/// * `config` - The configuration to save
/// * `path` - Destination file (e.g., "afm_config.json")
pub fn save_config(config: &AnalysisConfig, path: &Path) -> Result<()> {
    let json_string =
        serde_json::to_string_pretty(config).context("failed to serialize config")?;
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(json_string.as_bytes())?;
    Ok(())
}

/// Loads an analysis configuration from a JSON file.
///
/// Missing fields take their defaults. The loaded values are validated.
pub fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let mut file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut data = String::new();
    file.read_to_string(&mut data)?;
    let config: AnalysisConfig = serde_json::from_str(&data)
        .with_context(|| format!("invalid config in {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("afm-vision-{}-{name}", std::process::id()))
    }

    #[test]
    fn config_round_trips() {
        let path = scratch_file("roundtrip.json");
        let mut config = AnalysisConfig::default();
        config.nm_per_pixel = 7.5;
        config.defect.threshold = 31.0;
        config.reference_pitches_nm = vec![500.0];

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let path = scratch_file("invalid.json");
        std::fs::write(&path, r#"{ "nm_per_pixel": -1.0 }"#).unwrap();
        let err = load_config(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(format!("{err:#}").contains("nm per pixel"));
    }
}
