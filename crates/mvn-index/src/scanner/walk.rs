//! Ordered, single-threaded repository walk.
//!
//! Children of each directory are visited in scan order: descriptor files
//! (`.pom`) last, everything else in descending name order. The walk is
//! sequential so the listener observes primary artifacts before the
//! descriptor that shares their coordinate.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cancel::CancellationToken;
use crate::config::IndexConfig;
use crate::error::Result;

const DESCRIPTOR_SUFFIX: &str = ".pom";

/// Per-walk settings and counters.
#[derive(Debug)]
pub struct WalkData<'a> {
    /// Directories never descended into (the index directory itself).
    pub ignore_directories: &'a [PathBuf],
    pub config: &'a IndexConfig,
    pub cancel: &'a CancellationToken,
    /// Number of files handed to the visitor.
    pub num_files: usize,
    pub num_dirs: usize,
}

impl<'a> WalkData<'a> {
    pub fn new(
        config: &'a IndexConfig,
        ignore_directories: &'a [PathBuf],
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            ignore_directories,
            config,
            cancel,
            num_files: 0,
            num_dirs: 0,
        }
    }

    fn should_ignore(&self, path: &Path) -> bool {
        self.ignore_directories
            .iter()
            .any(|ignored| path == ignored || path.starts_with(ignored))
    }
}

/// Sort order of names within one directory.
pub fn scanner_file_order(a: &str, b: &str) -> Ordering {
    let a_descriptor = a.ends_with(DESCRIPTOR_SUFFIX);
    let b_descriptor = b.ends_with(DESCRIPTOR_SUFFIX);
    a_descriptor.cmp(&b_descriptor).then_with(|| b.cmp(a))
}

/// Walks `path` depth-first, calling `visit` for every eligible file.
///
/// Unreadable directories contribute no entries. The first error returned
/// by `visit`, or cancellation, stops the walk.
pub fn walk(
    path: &Path,
    walk_data: &mut WalkData<'_>,
    visit: &mut dyn FnMut(&Path) -> Result<()>,
) -> Result<()> {
    walk_data.cancel.check()?;
    if walk_data.should_ignore(path) {
        return Ok(());
    }

    let read_dir = match fs::read_dir(path) {
        Ok(iter) => iter,
        Err(error) => {
            log::debug!("cannot list {}: {error}", path.display());
            return Ok(());
        }
    };
    walk_data.num_dirs += 1;

    let mut entries: Vec<(String, PathBuf, bool)> = read_dir
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if walk_data.config.is_skipped_name(&name) {
                return None;
            }
            let file_type = entry.file_type().ok()?;
            let is_dir = if file_type.is_symlink() {
                entry.path().is_dir()
            } else {
                file_type.is_dir()
            };
            Some((name, entry.path(), is_dir))
        })
        .collect();

    entries.sort_unstable_by(|a, b| scanner_file_order(&a.0, &b.0));

    for (_, child_path, is_dir) in entries {
        walk_data.cancel.check()?;
        if is_dir {
            walk(&child_path, walk_data, visit)?;
        } else {
            walk_data.num_files += 1;
            visit(&child_path)?;
        }
    }
    Ok(())
}
