//! # Batch Module
//!
//! Analyses many image files on a fixed pool of worker threads.
//!
//! ## Architecture
//! - **Main Thread**: queues every path, then collects outcomes
//! - **Worker Threads**: decode and analyse one file at a time
//! - **Communication**: crossbeam channels for jobs and results
//!
//! A failing file is reported in its entry and does not stop the batch.

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use afm_core::{AnalysisConfig, AnalysisResult};
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use crate::image_io;
use crate::report::{AnalysisReport, BatchEntry};

/// Decodes and analyses a single file.
pub fn analyze_file(
    path: &Path,
    config: &AnalysisConfig,
) -> Result<(image_io::DecodedImage, AnalysisResult)> {
    let image = image_io::load_image(path)?;
    let result = afm_core::analyze_raster(&image.raster, config)
        .with_context(|| format!("analysis of {} failed", path.display()))?;
    Ok((image, result))
}

fn entry_for(path: &Path, config: &AnalysisConfig) -> BatchEntry {
    let source = path.display().to_string();
    match analyze_file(path, config) {
        Ok((_, result)) => BatchEntry {
            source,
            report: Some(AnalysisReport::new(path, &result, config.nm_per_pixel)),
            error: None,
        },
        Err(e) => {
            warn!("[BATCH] {source}: {e:#}");
            BatchEntry {
                source,
                report: None,
                error: Some(format!("{e:#}")),
            }
        }
    }
}

fn spawn_worker(
    id: usize,
    jobs: Receiver<(usize, PathBuf)>,
    results: Sender<(usize, BatchEntry)>,
    config: AnalysisConfig,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name(format!("afm-worker-{id}"))
        .spawn(move || {
            for (index, path) in jobs.iter() {
                debug!("[WORKER-{id}] analysing {}", path.display());
                if results.send((index, entry_for(&path, &config))).is_err() {
                    debug!("[WORKER-{id}] result channel closed");
                    break;
                }
            }
        })
        .with_context(|| format!("failed to spawn worker {id}"))?;
    Ok(handle)
}

/// Runs the analysis over `paths` with up to `threads` workers.
///
/// # Arguments
/// * `paths` - Image files to analyse
/// * `config` - Shared analysis parameters
/// * `threads` - Worker count, clamped to `1..=paths.len()`
///
/// # Returns
/// * One entry per path, in input order
pub fn run_batch(
    paths: &[PathBuf],
    config: &AnalysisConfig,
    threads: usize,
) -> Result<Vec<BatchEntry>> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let (job_tx, job_rx) = crossbeam_channel::unbounded();
    let (result_tx, result_rx) = crossbeam_channel::unbounded();
    for job in paths.iter().cloned().enumerate() {
        job_tx.send(job).context("job queue closed")?;
    }
    // Workers exit once the queue drains.
    drop(job_tx);

    let worker_count = threads.clamp(1, paths.len());
    let workers = (0..worker_count)
        .map(|id| spawn_worker(id, job_rx.clone(), result_tx.clone(), config.clone()))
        .collect::<Result<Vec<_>>>()?;
    drop(result_tx);

    let mut slots: Vec<Option<BatchEntry>> = vec![None; paths.len()];
    for (index, entry) in result_rx.iter() {
        slots[index] = Some(entry);
    }

    for worker in workers {
        if worker.join().is_err() {
            warn!("[BATCH] a worker thread panicked");
        }
    }

    // A slot stays empty only if its worker died mid-file.
    Ok(slots
        .into_iter()
        .zip(paths)
        .map(|(slot, path)| {
            slot.unwrap_or_else(|| BatchEntry {
                source: path.display().to_string(),
                report: None,
                error: Some("worker terminated before finishing this file".into()),
            })
        })
        .collect())
}
