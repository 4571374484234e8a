use afm_core::synthetic::{stripe_grating, CircularGrating};
use afm_core::{analyze, analyze_raster, detect_defects, estimate_pitch};
use afm_core::{AnalysisConfig, AnalysisError, DefectConfig, PitchConfig, Raster};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

fn within_one_bin(estimated: f32, period: f32, transform_len: usize) {
    let tolerance = period * period / transform_len as f32;
    assert!(
        (estimated - period).abs() <= tolerance,
        "estimated {estimated}, expected {period} ± {tolerance}"
    );
}

#[test]
fn period_16_grating_on_256_square() {
    let raster = stripe_grating(256, 256, 16.0, 60.0, 128.0).unwrap();
    let config = AnalysisConfig {
        nm_per_pixel: 10.0,
        ..AnalysisConfig::default()
    };
    let result = analyze_raster(&raster, &config).unwrap();

    assert_eq!(result.pitch.transform_len, 256);
    assert_eq!(result.pitch.peak_bin, 16);
    assert_eq!(result.pitch.pitch_px, 16.0);
    assert_eq!(result.pitch_nm, 160.0);
    assert_eq!(result.defects.width(), 256);
    assert_eq!(result.defects.height(), 256);
}

#[test]
fn gratings_are_found_within_one_bin() {
    for (width, period) in [(256, 8.0), (300, 32.0), (1024, 64.0), (200, 10.0)] {
        let raster = stripe_grating(width, 40, period, 50.0, 128.0).unwrap();
        let estimate = estimate_pitch(&raster, &PitchConfig::default()).unwrap();
        within_one_bin(estimate.pitch_px, period, estimate.transform_len);
    }
}

#[test]
fn noisy_grating_is_still_found() {
    let mut rng = StdRng::seed_from_u64(11);
    let clean = stripe_grating(512, 128, 32.0, 40.0, 128.0).unwrap();
    let noisy: Vec<f32> = clean
        .data()
        .iter()
        .map(|&v| {
            let n: f32 = rng.sample(StandardNormal);
            (v + 20.0 * n).clamp(0.0, 255.0)
        })
        .collect();
    let raster = Raster::from_vec(512, 128, noisy).unwrap();

    let estimate = estimate_pitch(&raster, &PitchConfig::default()).unwrap();
    assert_eq!(estimate.peak_bin, 16);
    assert_eq!(estimate.pitch_px, 32.0);
}

#[test]
fn brightness_offset_does_not_move_the_peak() {
    let base = stripe_grating(128, 64, 8.0, 30.0, 90.0).unwrap();
    let shifted = base.data().iter().map(|v| v + 70.0).collect();
    let brighter = Raster::from_vec(128, 64, shifted).unwrap();

    let a = estimate_pitch(&base, &PitchConfig::default()).unwrap();
    let b = estimate_pitch(&brighter, &PitchConfig::default()).unwrap();
    assert_eq!(a.peak_bin, b.peak_bin);
    assert_eq!(a.pitch_px, b.pitch_px);
}

#[test]
fn doubling_width_keeps_the_pitch() {
    let narrow = stripe_grating(256, 32, 16.0, 50.0, 128.0).unwrap();
    let wide = stripe_grating(512, 32, 16.0, 50.0, 128.0).unwrap();

    let a = estimate_pitch(&narrow, &PitchConfig::default()).unwrap();
    let b = estimate_pitch(&wide, &PitchConfig::default()).unwrap();
    assert_eq!(b.peak_bin, 2 * a.peak_bin);
    within_one_bin(b.pitch_px, a.pitch_px, a.transform_len);
}

#[test]
fn horizontal_lines_are_not_reported_as_their_period() {
    // Period along y only: each row is constant, nothing survives DC removal.
    let raster = Raster::from_fn(64, 64, |_, y| 128.0 + 50.0 * (y as f32 * 0.8).sin()).unwrap();
    let estimate = estimate_pitch(&raster, &PitchConfig::default()).unwrap();
    assert!(estimate.spectrum.bins().iter().all(|&m| m < 1.0));
}

#[test]
fn flat_raster_has_no_defects() {
    let raster = Raster::from_vec(40, 30, vec![173.0; 1200]).unwrap();
    let mask = detect_defects(&raster, &DefectConfig::default()).unwrap();
    assert_eq!(mask.flagged_count(), 0);
    assert_eq!(mask.flagged_fraction(), 0.0);
}

#[test]
fn isolated_spike_is_flagged_and_distant_pixels_are_not() {
    let raster =
        Raster::from_fn(64, 64, |x, y| if (x, y) == (32, 32) { 200.0 } else { 100.0 }).unwrap();
    let mask = detect_defects(&raster, &DefectConfig::default()).unwrap();

    assert!(mask.is_defect(32, 32));
    assert_eq!(mask.flagged_count(), 1);
    for (x, y) in [(0, 0), (10, 32), (32, 53), (63, 63), (42, 42)] {
        assert!(!mask.is_defect(x, y), "({x},{y}) flagged");
    }
}

#[test]
fn spike_at_the_corner_uses_replicated_edges() {
    let raster =
        Raster::from_fn(20, 20, |x, y| if (x, y) == (0, 0) { 200.0 } else { 100.0 }).unwrap();
    let mask = detect_defects(&raster, &DefectConfig::default()).unwrap();

    // The corner sample is replicated 100 times into its own window.
    assert!(mask.is_defect(0, 0));
    assert!(!mask.is_defect(1, 1));
}

#[test]
fn repeated_runs_are_identical() {
    let raster = CircularGrating {
        size: 128,
        pitch_px: 16.0,
        seed: 5,
        ..CircularGrating::default()
    }
    .generate()
    .unwrap();

    let config = AnalysisConfig::default();
    let first = analyze_raster(&raster, &config).unwrap();
    let second = analyze_raster(&raster, &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn tiny_rasters_fail_cleanly() {
    let one = Raster::from_vec(1, 1, vec![12.0]).unwrap();
    assert!(matches!(
        analyze_raster(&one, &AnalysisConfig::default()),
        Err(AnalysisError::InvalidInput { .. })
    ));

    assert!(matches!(
        analyze(&[0, 0, 0, 255], 1, 1, &AnalysisConfig::default()),
        Err(AnalysisError::InvalidInput { .. })
    ));
    assert!(matches!(
        analyze(&[], 0, 0, &AnalysisConfig::default()),
        Err(AnalysisError::InvalidInput { .. })
    ));
    assert!(matches!(
        analyze(&[0; 12], 4, 1, &AnalysisConfig::default()),
        Err(AnalysisError::InvalidInput { .. })
    ));
}

#[test]
fn rgba_entry_point_reports_references() {
    let raster = stripe_grating(256, 64, 64.0, 60.0, 128.0).unwrap();
    let config = AnalysisConfig {
        nm_per_pixel: 10.5,
        ..AnalysisConfig::default()
    };
    let result = analyze(&raster.to_rgba(), 256, 64, &config).unwrap();

    assert_eq!(result.pitch.pitch_px, 64.0);
    assert_eq!(result.pitch_nm, 672.0);
    assert_eq!(result.references.len(), 3);
    assert_eq!(result.nearest_reference().unwrap().target_nm, 668.0);
}
