//! # Image I/O Module
//!
//! Decoding and encoding of image files. The analysis core only ever sees
//! plain pixel buffers produced here.

use std::path::{Path, PathBuf};

use afm_core::Raster;
use afm_core::gray::{gray8_to_raster, rgba_to_raster};
use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, ImageReader};

/// File extensions picked up when a directory is given as input.
const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// A decoded image: RGBA for rendering, plus the intensity raster to analyse.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: usize,
    pub height: usize,
    /// Interleaved 8-bit RGBA.
    pub pixels: Vec<u8>,
    pub raster: Raster,
}

/// Decodes any supported image file.
///
/// Single-channel 8-bit files keep their levels as intensities; everything
/// else goes through the luminance weights.
///
/// # Arguments
/// * `path` - PNG, JPEG or BMP file
///
/// # Returns
/// * `Ok(image)` - Decoded pixels
/// * `Err(e)` - The file cannot be opened or decoded
pub fn load_image(path: &Path) -> Result<DecodedImage> {
    let decoded = ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("failed to read {}", path.display()))?
        .decode()
        .with_context(|| format!("failed to decode {}", path.display()))?;

    let (width, height) = (decoded.width() as usize, decoded.height() as usize);
    let rgba = decoded.to_rgba8().into_raw();
    let raster = match &decoded {
        DynamicImage::ImageLuma8(gray) => gray8_to_raster(gray.as_raw(), width, height)?,
        _ => rgba_to_raster(&rgba, width, height)?,
    };
    Ok(DecodedImage {
        width,
        height,
        pixels: rgba,
        raster,
    })
}

/// Encodes an RGBA buffer; the format follows the file extension.
pub fn save_rgba(path: &Path, width: usize, height: usize, pixels: Vec<u8>) -> Result<()> {
    let buffer = image::RgbaImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| anyhow!("rgba buffer does not match {width}x{height}"))?;
    buffer
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Encodes a single-channel 8-bit buffer.
pub fn save_gray(path: &Path, width: usize, height: usize, pixels: Vec<u8>) -> Result<()> {
    let buffer = image::GrayImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| anyhow!("gray buffer does not match {width}x{height}"))?;
    buffer
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expands directories into their supported image files, sorted by path.
///
/// Plain files are kept as given, whatever their extension.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("failed to list {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && is_supported(path))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}
