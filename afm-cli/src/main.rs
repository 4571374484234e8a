//! # AFM-Vision - Grating Image Quality Assurance CLI
//!
//! Command-line front end for the `afm-core` analysis crate. It decodes AFM
//! topography images, estimates the grating pitch, flags local-contrast
//! defects and writes overlays and JSON reports.
//!
//! ## Commands
//! - **analyze**: one image, optional overlay/mask/report output
//! - **batch**: many images on worker threads
//! - **synth**: synthetic grating images with a known pitch
//! - **config**: writes the default configuration file

mod batch;
mod config_file;
mod image_io;
mod report;

use std::path::PathBuf;

use afm_core::fft::SpectrumWindow;
use afm_core::overlay::{mask_to_rgba, render_overlay};
use afm_core::synthetic::{CircularGrating, stripe_grating};
use afm_core::AnalysisConfig;
use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use report::AnalysisReport;

#[derive(Parser)]
#[command(name = "afm-vision")]
#[command(
    version,
    about = "Estimate grating pitch and flag surface defects in AFM images",
    long_about = None
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a single image
    Analyze(AnalyzeArgs),

    /// Analyse image files or directories in parallel
    Batch(BatchArgs),

    /// Write a synthetic grating image with a known pitch
    Synth(SynthArgs),

    /// Write the default configuration as JSON
    Config {
        /// Output file
        #[arg(value_name = "FILE")]
        out: PathBuf,
    },
}

/// Parameters shared by the analysing commands; flags override the config file.
#[derive(Debug, Clone, Args)]
struct CalibrationArgs {
    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scan calibration in nanometres per pixel
    #[arg(short = 's', long, value_name = "NM")]
    nm_per_pixel: Option<f32>,

    /// Defect window half-width in pixels
    #[arg(long, value_name = "PX")]
    window: Option<usize>,

    /// Defect threshold on the 0-255 intensity scale
    #[arg(long, value_name = "LEVEL")]
    threshold: Option<f32>,

    /// Apply a Hann window to each row before the transform
    #[arg(long)]
    hann: bool,
}

impl CalibrationArgs {
    fn resolve(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => config_file::load_config(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(nm) = self.nm_per_pixel {
            config.nm_per_pixel = nm;
        }
        if let Some(window) = self.window {
            config.defect.half_window = window;
        }
        if let Some(threshold) = self.threshold {
            config.defect.threshold = threshold;
        }
        if self.hann {
            config.pitch.window = SpectrumWindow::Hann;
        }
        config.validate().context("invalid analysis parameters")?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Args)]
struct AnalyzeArgs {
    /// Input image (PNG, JPEG or BMP)
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    #[command(flatten)]
    calibration: CalibrationArgs,

    /// Write the image with defects tinted
    #[arg(long, value_name = "FILE")]
    overlay: Option<PathBuf>,

    /// Write the binary defect map
    #[arg(long, value_name = "FILE")]
    mask: Option<PathBuf>,

    /// Write the analysis report as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct BatchArgs {
    /// Input files or directories
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    calibration: CalibrationArgs,

    /// Number of worker threads
    #[arg(short = 'j', long, value_name = "N")]
    threads: Option<usize>,

    /// Write all entries as a JSON array
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct SynthArgs {
    /// Output image
    #[arg(value_name = "FILE")]
    out: PathBuf,

    /// Grating pitch in pixels
    #[arg(long, value_name = "PX", default_value = "68.0")]
    pitch_px: f32,

    /// Side length of the square image
    #[arg(long, value_name = "PX", default_value = "512")]
    size: usize,

    /// Standard deviation of the Gaussian noise
    #[arg(long, value_name = "LEVEL", default_value = "8.0")]
    noise: f32,

    /// Random seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Leave out the raised centre feature
    #[arg(long)]
    no_center_defect: bool,

    /// Straight vertical stripes instead of circular rings
    #[arg(long)]
    stripes: bool,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze(args) => run_analyze(args),
        Commands::Batch(args) => run_batch(args),
        Commands::Synth(args) => run_synth(args),
        Commands::Config { out } => {
            config_file::save_config(&AnalysisConfig::default(), &out)?;
            info!("[MAIN] Default configuration written to {}", out.display());
            Ok(())
        }
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = args.calibration.resolve()?;
    info!("[MAIN] Analysing {} at {} nm/px", args.image.display(), config.nm_per_pixel);

    let (image, result) = batch::analyze_file(&args.image, &config)?;
    let report = AnalysisReport::new(&args.image, &result, config.nm_per_pixel);
    println!("{}", report.summary_line());
    for comparison in &report.references {
        println!(
            "  {:.0} nm: {:.1} nm deviation ({:+.2}%)",
            comparison.target_nm, comparison.deviation_nm, comparison.relative_percent
        );
    }

    if let Some(path) = &args.overlay {
        let pixels = render_overlay(&image.pixels, &result.defects, &config.overlay)?;
        image_io::save_rgba(path, image.width, image.height, pixels)?;
        info!("[MAIN] Overlay written to {}", path.display());
    }
    if let Some(path) = &args.mask {
        let pixels = mask_to_rgba(&result.defects, config.overlay.color);
        image_io::save_rgba(path, image.width, image.height, pixels)?;
        info!("[MAIN] Defect map written to {}", path.display());
    }
    if let Some(path) = &args.report {
        report::write_json(&report, path)?;
        info!("[MAIN] Report written to {}", path.display());
    }
    Ok(())
}

fn run_batch(args: BatchArgs) -> Result<()> {
    let config = args.calibration.resolve()?;
    let files = image_io::expand_inputs(&args.inputs)?;
    if files.is_empty() {
        bail!("no image files found in the given inputs");
    }

    let threads = args
        .threads
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
    info!("[BATCH] {} files on {} threads", files.len(), threads.min(files.len()));

    let entries = batch::run_batch(&files, &config, threads)?;
    let mut failures = 0;
    for entry in &entries {
        match (&entry.report, &entry.error) {
            (Some(report), _) => println!("{}", report.summary_line()),
            (None, Some(error)) => {
                failures += 1;
                println!("{}: FAILED ({error})", entry.source);
            }
            (None, None) => {}
        }
    }
    info!("[BATCH] {} succeeded, {} failed", entries.len() - failures, failures);

    if let Some(path) = &args.report {
        report::write_json(&entries, path)?;
        info!("[BATCH] Report written to {}", path.display());
    }
    Ok(())
}

fn run_synth(args: SynthArgs) -> Result<()> {
    let raster = if args.stripes {
        stripe_grating(args.size, args.size, args.pitch_px, 50.0, 128.0)?
    } else {
        CircularGrating {
            size: args.size,
            pitch_px: args.pitch_px,
            noise_level: args.noise,
            center_defect: !args.no_center_defect,
            seed: args.seed,
            ..CircularGrating::default()
        }
        .generate()?
    };

    image_io::save_gray(&args.out, raster.width(), raster.height(), raster.to_gray8())?;
    info!(
        "[SYNTH] {}x{} grating with {} px pitch written to {}",
        raster.width(),
        raster.height(),
        args.pitch_px,
        args.out.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "afm-vision",
            "analyze",
            "scan.png",
            "-s",
            "12.5",
            "--window",
            "4",
            "--threshold",
            "30",
            "--hann",
        ])
        .unwrap();
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let config = args.calibration.resolve().unwrap();

        assert_eq!(config.nm_per_pixel, 12.5);
        assert_eq!(config.defect.half_window, 4);
        assert_eq!(config.defect.threshold, 30.0);
        assert_eq!(config.pitch.window, SpectrumWindow::Hann);
    }

    #[test]
    fn out_of_range_flags_are_rejected() {
        let cli = Cli::try_parse_from(["afm-vision", "batch", "dir", "-s", "0"]).unwrap();
        let Commands::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert!(args.calibration.resolve().is_err());

        let cli = Cli::try_parse_from(["afm-vision", "analyze", "scan.png", "--window", "5000"])
            .unwrap();
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert!(args.calibration.resolve().is_err());
    }

    #[test]
    fn synthesized_stripes_are_measured_from_disk() {
        let dir = std::env::temp_dir().join(format!("afm-vision-synth-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let out = dir.join("stripes.png");

        run_synth(SynthArgs {
            out: out.clone(),
            pitch_px: 16.0,
            size: 256,
            noise: 0.0,
            seed: 0,
            no_center_defect: true,
            stripes: true,
        })
        .unwrap();
        let (image, result) = batch::analyze_file(&out, &AnalysisConfig::default()).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!((image.width, image.height), (256, 256));
        assert_eq!(result.pitch.peak_bin, 16);
        assert_eq!(result.pitch.pitch_px, 16.0);
        assert_eq!(result.pitch_nm, 160.0);
    }
}
