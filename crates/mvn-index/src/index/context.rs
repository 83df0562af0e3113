use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use super::build::{build_index, has_existing_index, refresh_index};
use super::registry::LocationLease;
use crate::cancel::CancellationToken;
use crate::config::IndexConfig;
use crate::coordinate::ArtifactCoordinate;
use crate::criteria::{compile, Criterion};
use crate::engine::{IndexEngine, SnapshotIndex};
use crate::error::{canonicalize_existing_path, IndexError, Result};
use crate::extract::ExtractorSet;
use crate::ontology;
use crate::scanner::{ScanError, ScanResult, ScanSummary};
use crate::types::ArtifactRecord;
use crate::version::{ArtifactFilter, MavenVersion};

/// An open index over one repository root.
///
/// Only one context may be open per root at a time. Queries take a shared
/// lock on the engine and may run concurrently; [`IndexContext::refresh`]
/// and [`IndexContext::close`] take it exclusively. Dropping an open context
/// closes it.
pub struct IndexContext {
    repo_root: PathBuf,
    index_dir: PathBuf,
    config: IndexConfig,
    extractors: ExtractorSet,
    engine: RwLock<Option<Box<dyn IndexEngine>>>,
    lease: Mutex<Option<LocationLease>>,
    /// Set after an interrupted refresh; the engine is then never committed.
    unreliable: AtomicBool,
    last_scan: Mutex<Option<ScanSummary>>,
    scan_errors: Mutex<Vec<ScanError>>,
}

impl std::fmt::Debug for IndexContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexContext")
            .field("repo_root", &self.repo_root)
            .field("index_dir", &self.index_dir)
            .field("open", &self.is_open())
            .finish()
    }
}

impl IndexContext {
    /// Opens the index under `repo_root`, building it first unless a usable
    /// one already exists.
    pub fn open_or_build(
        repo_root: &Path,
        config: IndexConfig,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        config.validate()?;
        if !repo_root.is_dir() {
            return Err(IndexError::NotFound(format!(
                "repository root {} is not a directory",
                repo_root.display()
            )));
        }
        let repo_root = canonicalize_existing_path(repo_root.to_path_buf());
        let lease = LocationLease::acquire(&repo_root, &config.lock_path(&repo_root))?;
        let extractors = ExtractorSet::standard(&config)?;
        let index_dir = config.index_dir(&repo_root);

        let reused = if has_existing_index(&index_dir, config.min_index_entries) {
            let opened = SnapshotIndex::open(&index_dir, extractors.schema().clone());
            if opened.is_none() {
                log::warn!(
                    "index at {} is unreliable, rebuilding",
                    index_dir.display()
                );
            }
            opened
        } else {
            None
        };

        let (engine, scan) = match reused {
            Some(engine) => {
                log::info!(
                    "reusing index at {} ({} documents)",
                    index_dir.display(),
                    engine.len()
                );
                (engine, None)
            }
            None => {
                let (engine, result) =
                    build_index(&repo_root, &config, &extractors, &index_dir, cancel)?;
                (engine, Some(result))
            }
        };

        let (last_scan, scan_errors) = match scan {
            Some(result) => (Some(result.summary()), result.errors),
            None => (None, Vec::new()),
        };

        Ok(Self {
            repo_root,
            index_dir,
            config,
            extractors,
            engine: RwLock::new(Some(Box::new(engine))),
            lease: Mutex::new(Some(lease)),
            unreliable: AtomicBool::new(false),
            last_scan: Mutex::new(last_scan),
            scan_errors: Mutex::new(scan_errors),
        })
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn extractors(&self) -> &ExtractorSet {
        &self.extractors
    }

    pub fn is_open(&self) -> bool {
        self.engine.read().is_some()
    }

    /// Summary of the most recent build or refresh; `None` when the index
    /// was reused as-is.
    pub fn scan_summary(&self) -> Option<ScanSummary> {
        *self.last_scan.lock()
    }

    /// Per-file failures of the most recent build or refresh.
    pub fn take_scan_errors(&self) -> Vec<ScanError> {
        std::mem::take(&mut *self.scan_errors.lock())
    }

    /// Number of indexed documents.
    pub fn len(&self) -> Result<usize> {
        self.with_engine(|engine| Ok(engine.len()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    // ----- Queries -----

    pub fn search(&self, criterion: &Criterion) -> Result<Vec<ArtifactRecord>> {
        let query = compile(criterion);
        log::debug!("search {criterion} as {query}");
        let documents = self.with_engine(|engine| engine.search(&query))?;
        Ok(documents
            .iter()
            .filter_map(|document| {
                let record = self.extractors.record_from_document(document);
                if record.is_none() {
                    log::warn!("skipping indexed document without identity fields");
                }
                record
            })
            .collect())
    }

    pub fn search_filtered(
        &self,
        criterion: &Criterion,
        filter: &dyn ArtifactFilter,
    ) -> Result<Vec<ArtifactRecord>> {
        let mut records = self.search(criterion)?;
        records.retain(|record| filter.accepts(record));
        Ok(records)
    }

    /// Results keyed by `groupId:artifactId`, each group ordered by version
    /// with the newest last.
    pub fn search_grouped(
        &self,
        criterion: &Criterion,
    ) -> Result<BTreeMap<String, Vec<ArtifactRecord>>> {
        let mut groups: BTreeMap<String, Vec<ArtifactRecord>> = BTreeMap::new();
        for record in self.search(criterion)? {
            let coordinate = record.coordinate();
            let key = format!("{}:{}", coordinate.group_id(), coordinate.artifact_id());
            groups.entry(key).or_default().push(record);
        }
        for records in groups.values_mut() {
            records.sort_by_cached_key(|record| MavenVersion::parse(record.coordinate().version()));
        }
        Ok(groups)
    }

    /// Reads a stored attribute of `coordinate`, including stored-only
    /// fields that no query can match. The unclassified artifact wins when
    /// several files carry the attribute.
    pub fn stored_attribute(
        &self,
        coordinate: &ArtifactCoordinate,
        key: &str,
    ) -> Result<Option<String>> {
        let criterion = Criterion::all(vec![
            Criterion::leaf(ontology::GROUP_ID.name, coordinate.group_id()),
            Criterion::leaf(ontology::ARTIFACT_ID.name, coordinate.artifact_id()),
            Criterion::leaf(ontology::VERSION.name, coordinate.version()),
        ])?;
        let mut records = self.search(&criterion)?;
        records.sort_by_key(|record| record.classifier().is_some());
        Ok(records
            .iter()
            .find_map(|record| record.attribute(key).map(str::to_string)))
    }

    // ----- Lifecycle -----

    /// Rescans the repository and applies additions, changes and deletions
    /// to the open index.
    ///
    /// An interrupted refresh leaves this context usable for queries, but
    /// its contents are never persisted and the next open rebuilds.
    pub fn refresh(&self, cancel: &CancellationToken) -> Result<ScanResult> {
        let mut guard = self.engine.write();
        let engine = guard
            .as_deref_mut()
            .ok_or_else(|| self.closed_error())?;
        let result = refresh_index(
            &self.repo_root,
            &self.config,
            &self.extractors,
            engine,
            &self.index_dir,
            cancel,
        )?;
        if !result.is_complete() {
            self.unreliable.store(true, Ordering::Release);
        }
        *self.last_scan.lock() = Some(result.summary());
        Ok(result)
    }

    /// Persists pending changes and releases the repository location.
    pub fn close(&self) -> Result<()> {
        let engine = self.engine.write().take();
        let Some(mut engine) = engine else {
            return Err(self.closed_error());
        };
        let committed = if self.unreliable.load(Ordering::Acquire) {
            log::warn!(
                "discarding unreliable index for {}",
                self.repo_root.display()
            );
            Ok(())
        } else {
            engine.commit()
        };
        drop(engine);
        self.lease.lock().take();
        log::debug!("closed index for {}", self.repo_root.display());
        committed
    }

    fn with_engine<T>(&self, f: impl FnOnce(&dyn IndexEngine) -> Result<T>) -> Result<T> {
        let guard = self.engine.read();
        let engine = guard.as_deref().ok_or_else(|| self.closed_error())?;
        f(engine)
    }

    fn closed_error(&self) -> IndexError {
        IndexError::Lifecycle(format!(
            "index context for {} is closed",
            self.repo_root.display()
        ))
    }
}

impl Drop for IndexContext {
    fn drop(&mut self) {
        if self.engine.get_mut().is_some() {
            if let Err(error) = self.close() {
                log::error!(
                    "failed to close index for {}: {error}",
                    self.repo_root.display()
                );
            }
        }
    }
}
