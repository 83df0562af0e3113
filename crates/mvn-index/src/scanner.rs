//! Repository scanning.
//!
//! A scan walks the repository in scan order (see [`walk::scanner_file_order`]),
//! turns each file into an [`ArtifactContext`] and hands it to a
//! [`ScanListener`]. Per-file failures are collected in the [`ScanResult`];
//! only failures for which [`IndexError::aborts_scan`] holds stop the walk.

mod producer;
mod walk;

use std::path::{Path, PathBuf};

pub use producer::{ArtifactContext, ArtifactContextProducer};
pub use walk::scanner_file_order;

use crate::cancel::CancellationToken;
use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use walk::WalkData;

/// Receives discovered artifacts during a scan.
pub trait ScanListener {
    fn scanning_started(&mut self, _root: &Path) {}

    /// Called once per artifact file, in scan order.
    fn artifact_discovered(&mut self, context: ArtifactContext) -> Result<()>;

    fn scanning_finished(&mut self, _result: &ScanResult) {}
}

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed,
    Cancelled,
    /// Stopped by an engine or lifecycle failure; the result is partial.
    Aborted,
}

/// A file that could not be indexed.
#[derive(Debug)]
pub struct ScanError {
    pub path: PathBuf,
    pub error: IndexError,
}

#[derive(Debug)]
pub struct ScanResult {
    /// Number of artifact files handed to the listener.
    pub total_files: usize,
    /// Number of previously indexed files found missing (incremental refresh).
    pub deleted_files: usize,
    pub errors: Vec<ScanError>,
    pub outcome: ScanOutcome,
}

impl ScanResult {
    fn new() -> Self {
        Self {
            total_files: 0,
            deleted_files: 0,
            errors: Vec::new(),
            outcome: ScanOutcome::Completed,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == ScanOutcome::Completed
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            total_files: self.total_files,
            deleted_files: self.deleted_files,
            error_count: self.errors.len(),
            outcome: self.outcome,
        }
    }
}

/// Counts-only view of a [`ScanResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub total_files: usize,
    pub deleted_files: usize,
    pub error_count: usize,
    pub outcome: ScanOutcome,
}

/// Walks one repository root.
pub struct RepositoryScanner<'a> {
    root: &'a Path,
    config: &'a IndexConfig,
    ignore_directories: Vec<PathBuf>,
}

impl<'a> RepositoryScanner<'a> {
    pub fn new(root: &'a Path, config: &'a IndexConfig) -> Self {
        Self {
            root,
            config,
            ignore_directories: vec![config.index_dir(root)],
        }
    }

    pub fn scan(&self, listener: &mut dyn ScanListener, cancel: &CancellationToken) -> ScanResult {
        let producer = ArtifactContextProducer::new(self.root);
        let mut result = ScanResult::new();
        let mut walk_data = WalkData::new(self.config, &self.ignore_directories, cancel);
        let mut current: Option<PathBuf> = None;

        listener.scanning_started(self.root);
        log::info!("scanning repository {}", self.root.display());

        let walked = walk::walk(self.root, &mut walk_data, &mut |path| {
            current = Some(path.to_path_buf());
            let outcome = match producer.produce(path) {
                Ok(Some(context)) => {
                    result.total_files += 1;
                    listener.artifact_discovered(context)
                }
                Ok(None) => Ok(()),
                Err(error) => Err(error),
            };
            match outcome {
                Err(error) if !error.aborts_scan() => {
                    log::warn!("failed to index {}: {error}", path.display());
                    result.errors.push(ScanError {
                        path: path.to_path_buf(),
                        error,
                    });
                    Ok(())
                }
                other => other,
            }
        });

        match walked {
            Ok(()) => {}
            Err(IndexError::Cancelled) => {
                log::info!("scan of {} cancelled", self.root.display());
                result.outcome = ScanOutcome::Cancelled;
            }
            Err(error) => {
                log::error!("scan of {} aborted: {error}", self.root.display());
                result.errors.push(ScanError {
                    path: current.unwrap_or_else(|| self.root.to_path_buf()),
                    error,
                });
                result.outcome = ScanOutcome::Aborted;
            }
        }

        log::info!(
            "scanned {} artifacts under {} ({} files, {} dirs, {} errors)",
            result.total_files,
            self.root.display(),
            walk_data.num_files,
            walk_data.num_dirs,
            result.errors.len()
        );
        listener.scanning_finished(&result);
        result
    }
}
