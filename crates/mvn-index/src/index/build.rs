//! Full index builds and incremental refreshes.

use std::fs::{self, Metadata};
use std::path::Path;

use fnv::{FnvHashMap, FnvHashSet};

use crate::cancel::CancellationToken;
use crate::config::IndexConfig;
use crate::engine::{persistence, IndexEngine, SnapshotIndex};
use crate::error::{IndexError, Result};
use crate::extract::{modified_millis, ExtractorSet};
use crate::ontology;
use crate::scanner::{ArtifactContext, RepositoryScanner, ScanListener, ScanOutcome, ScanResult};

// ---------------------------------------------------------------------------
// Full build
// ---------------------------------------------------------------------------

/// Writes every discovered artifact once; the first file with a given
/// `uinfo` wins.
pub(crate) struct IndexingListener<'a> {
    engine: &'a mut dyn IndexEngine,
    extractors: &'a ExtractorSet,
    indexed: FnvHashSet<String>,
    duplicates: usize,
}

impl<'a> IndexingListener<'a> {
    pub(crate) fn new(engine: &'a mut dyn IndexEngine, extractors: &'a ExtractorSet) -> Self {
        Self {
            engine,
            extractors,
            indexed: FnvHashSet::default(),
            duplicates: 0,
        }
    }
}

impl ScanListener for IndexingListener<'_> {
    fn artifact_discovered(&mut self, context: ArtifactContext) -> Result<()> {
        let record = self.extractors.populate(&context)?;
        if !self.indexed.insert(record.uinfo()) {
            log::debug!("skipping duplicate artifact {}", context.file.display());
            self.duplicates += 1;
            return Ok(());
        }
        self.engine.add_document(self.extractors.to_document(&record))
    }

    fn scanning_finished(&mut self, result: &ScanResult) {
        log::debug!(
            "indexed {} artifacts ({} duplicates, {} errors)",
            self.indexed.len(),
            self.duplicates,
            result.errors.len()
        );
    }
}

/// True when `index_dir` holds more than `min_entries` visible entries.
pub(crate) fn has_existing_index(index_dir: &Path, min_entries: usize) -> bool {
    let Ok(entries) = fs::read_dir(index_dir) else {
        return false;
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .count()
        > min_entries
}

/// Deletes any stale index, scans the repository and commits the result.
///
/// Nothing is committed unless the scan completes, so an interrupted build
/// leaves no snapshot behind and the next open rebuilds.
pub(crate) fn build_index(
    repo_root: &Path,
    config: &IndexConfig,
    extractors: &ExtractorSet,
    index_dir: &Path,
    cancel: &CancellationToken,
) -> Result<(SnapshotIndex, ScanResult)> {
    match fs::symlink_metadata(index_dir) {
        Ok(metadata) if metadata.is_dir() => {
            log::info!("removing stale index at {}", index_dir.display());
            fs::remove_dir_all(index_dir)?;
        }
        Ok(_) => {
            log::warn!("replacing non-directory at {} with an index", index_dir.display());
            fs::remove_file(index_dir)?;
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => return Err(error.into()),
    }
    fs::create_dir_all(index_dir)?;

    let mut engine = SnapshotIndex::create(index_dir, extractors.schema().clone());
    let mut result = {
        let mut listener = IndexingListener::new(&mut engine, extractors);
        RepositoryScanner::new(repo_root, config).scan(&mut listener, cancel)
    };

    match result.outcome {
        ScanOutcome::Completed => {
            engine.commit()?;
            log::info!(
                "built index for {} ({} documents, {} files, {} errors)",
                repo_root.display(),
                engine.len(),
                result.total_files,
                result.errors.len()
            );
            Ok((engine, result))
        }
        ScanOutcome::Cancelled => Err(IndexError::Cancelled),
        ScanOutcome::Aborted => {
            log::warn!(
                "index build for {} aborted after {} files",
                repo_root.display(),
                result.total_files
            );
            Err(result
                .errors
                .pop()
                .map(|failure| failure.error)
                .unwrap_or_else(|| IndexError::Engine("index build aborted".to_string())))
        }
    }
}

// ---------------------------------------------------------------------------
// Incremental refresh
// ---------------------------------------------------------------------------

const DESCRIPTOR_SUFFIX: &str = ".pom";

struct FileStamp {
    size: Option<String>,
    modified: Option<String>,
    uinfo: Option<String>,
}

impl FileStamp {
    fn matches(&self, metadata: &Metadata) -> bool {
        self.size.as_deref() == Some(metadata.len().to_string().as_str())
            && self.modified == modified_millis(metadata)
    }
}

/// `(directory, file name)` of a repository-relative path.
fn split_parent(relative_path: &str) -> (&str, &str) {
    relative_path.rsplit_once('/').unwrap_or(("", relative_path))
}

/// Re-extracts new and changed files and remembers which indexed paths
/// were seen, so vanished ones can be deleted afterwards.
///
/// Artifacts carry attributes read from the descriptors beside them, so an
/// unchanged artifact is still re-extracted when any descriptor in its
/// directory was added, removed or modified.
struct RefreshListener<'a> {
    engine: &'a mut dyn IndexEngine,
    extractors: &'a ExtractorSet,
    known: FnvHashMap<String, FileStamp>,
    /// Indexed descriptor count per version directory.
    known_descriptors: FnvHashMap<String, usize>,
    /// Directories already compared against the index.
    checked_dirs: FnvHashMap<String, bool>,
    visited: FnvHashSet<String>,
    indexed: FnvHashSet<String>,
    updated: usize,
}

impl<'a> RefreshListener<'a> {
    fn new(engine: &'a mut dyn IndexEngine, extractors: &'a ExtractorSet) -> Self {
        let known: FnvHashMap<String, FileStamp> = engine
            .documents()
            .into_iter()
            .filter_map(|document| {
                let path = document.get(ontology::FILE_PATH.name)?.to_string();
                let stamp = FileStamp {
                    size: document.get(ontology::SIZE.name).map(str::to_string),
                    modified: document.get(ontology::LAST_MODIFIED.name).map(str::to_string),
                    uinfo: document.get(ontology::UINFO.name).map(str::to_string),
                };
                Some((path, stamp))
            })
            .collect();
        let mut known_descriptors: FnvHashMap<String, usize> = FnvHashMap::default();
        for path in known.keys() {
            let (dir, name) = split_parent(path);
            if name.ends_with(DESCRIPTOR_SUFFIX) {
                *known_descriptors.entry(dir.to_string()).or_default() += 1;
            }
        }
        Self {
            engine,
            extractors,
            known,
            known_descriptors,
            checked_dirs: FnvHashMap::default(),
            visited: FnvHashSet::default(),
            indexed: FnvHashSet::default(),
            updated: 0,
        }
    }

    /// The indexed stamp of `context`'s file when size and mtime still match.
    fn unchanged_stamp(&self, context: &ArtifactContext) -> Option<&FileStamp> {
        let stamp = self.known.get(&context.relative_path)?;
        let metadata = fs::metadata(&context.file).ok()?;
        stamp.matches(&metadata).then_some(stamp)
    }

    /// True when the descriptors beside `context`'s file are exactly the
    /// indexed ones, each with an unchanged stamp.
    fn descriptors_unchanged(&mut self, context: &ArtifactContext) -> bool {
        let (dir, _) = split_parent(&context.relative_path);
        if let Some(&unchanged) = self.checked_dirs.get(dir) {
            return unchanged;
        }
        let unchanged = self.compare_descriptors(dir, context.file.parent());
        if !unchanged {
            log::debug!("descriptors changed in {dir}");
        }
        self.checked_dirs.insert(dir.to_string(), unchanged);
        unchanged
    }

    fn compare_descriptors(&self, dir: &str, file_dir: Option<&Path>) -> bool {
        let Some(Ok(entries)) = file_dir.map(fs::read_dir) else {
            return false;
        };
        let mut on_disk = 0;
        for entry in entries {
            let Ok(entry) = entry else {
                return false;
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !name.ends_with(DESCRIPTOR_SUFFIX) {
                continue;
            }
            let Some(stamp) = self.known.get(&format!("{dir}/{name}")) else {
                return false;
            };
            match fs::metadata(entry.path()) {
                Ok(metadata) if stamp.matches(&metadata) => on_disk += 1,
                _ => return false,
            }
        }
        on_disk == self.known_descriptors.get(dir).copied().unwrap_or(0)
    }

    /// Deletes documents of indexed files the scan did not see again.
    fn remove_vanished(self) -> Result<usize> {
        let mut deleted = 0;
        for path in self.known.keys() {
            if self.visited.contains(path) {
                continue;
            }
            log::debug!("removing vanished artifact {path}");
            self.engine.delete_documents(ontology::FILE_PATH.name, path)?;
            deleted += 1;
        }
        Ok(deleted)
    }
}

impl ScanListener for RefreshListener<'_> {
    fn artifact_discovered(&mut self, context: ArtifactContext) -> Result<()> {
        self.visited.insert(context.relative_path.clone());
        if let Some(uinfo) = self.unchanged_stamp(&context).map(|stamp| stamp.uinfo.clone()) {
            if context.is_descriptor() || self.descriptors_unchanged(&context) {
                self.indexed.extend(uinfo);
                return Ok(());
            }
        }

        let record = self.extractors.populate(&context)?;
        self.engine
            .delete_documents(ontology::FILE_PATH.name, &context.relative_path)?;
        if !self.indexed.insert(record.uinfo()) {
            log::debug!("skipping duplicate artifact {}", context.file.display());
            return Ok(());
        }
        self.engine.add_document(self.extractors.to_document(&record))?;
        self.updated += 1;
        Ok(())
    }
}

/// Brings `engine` up to date with the repository and commits.
///
/// An incomplete scan leaves the in-memory index partially updated; its
/// snapshot is removed so the next open performs a full rebuild.
pub(crate) fn refresh_index(
    repo_root: &Path,
    config: &IndexConfig,
    extractors: &ExtractorSet,
    engine: &mut dyn IndexEngine,
    index_dir: &Path,
    cancel: &CancellationToken,
) -> Result<ScanResult> {
    let mut listener = RefreshListener::new(engine, extractors);
    let mut result = RepositoryScanner::new(repo_root, config).scan(&mut listener, cancel);

    if !result.is_complete() {
        log::warn!(
            "refresh of {} did not complete ({:?}); index marked for rebuild",
            repo_root.display(),
            result.outcome
        );
        persistence::remove_snapshot(index_dir)?;
        return Ok(result);
    }

    let updated = listener.updated;
    result.deleted_files = listener.remove_vanished()?;
    engine.commit()?;
    log::info!(
        "refreshed index for {} ({updated} updated, {} deleted)",
        repo_root.display(),
        result.deleted_files
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineQuery;
    use crate::testutil::RepoFixture;

    #[test]
    fn existing_index_requires_visible_entries() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join(".index");
        assert!(!has_existing_index(&dir, 0));

        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(".DS_Store"), "").unwrap();
        assert!(!has_existing_index(&dir, 0));

        fs::write(dir.join("index.bin.zst"), "").unwrap();
        assert!(has_existing_index(&dir, 0));
        assert!(!has_existing_index(&dir, 1));
    }

    #[test]
    fn build_deduplicates_on_uinfo_and_commits() {
        let repo = RepoFixture::new();
        repo.pom("org.example", "foo", "1.0", "jar", None, &[]);
        repo.jar("org.example", "foo", "1.0", &["org/example/Foo.class"]);

        let config = IndexConfig::default();
        let extractors = ExtractorSet::standard(&config).unwrap();
        let index_dir = config.index_dir(repo.root());
        fs::create_dir_all(&index_dir).unwrap();
        fs::write(index_dir.join("stale"), "old").unwrap();

        let (engine, result) = build_index(
            repo.root(),
            &config,
            &extractors,
            &index_dir,
            &CancellationToken::noop(),
        )
        .unwrap();
        assert_eq!(result.total_files, 2);
        assert_eq!(engine.len(), 2);
        assert!(!index_dir.join("stale").exists());
        assert!(persistence::snapshot_path(&index_dir).exists());

        let mut scratch = SnapshotIndex::create(&index_dir, extractors.schema().clone());
        let mut listener = IndexingListener::new(&mut scratch, &extractors);
        let producer = crate::scanner::ArtifactContextProducer::new(repo.root());
        let jar = repo.version_dir("org.example", "foo", "1.0").join("foo-1.0.jar");
        listener
            .artifact_discovered(producer.produce(&jar).unwrap().unwrap())
            .unwrap();
        listener
            .artifact_discovered(producer.produce(&jar).unwrap().unwrap())
            .unwrap();
        assert_eq!(listener.duplicates, 1);
    }

    #[test]
    fn build_replaces_a_plain_file_at_the_index_location() {
        let repo = RepoFixture::new();
        repo.jar("org.example", "foo", "1.0", &[]);

        let config = IndexConfig::default();
        let extractors = ExtractorSet::standard(&config).unwrap();
        let index_dir = config.index_dir(repo.root());
        fs::write(&index_dir, "not a directory").unwrap();

        let (engine, _) = build_index(
            repo.root(),
            &config,
            &extractors,
            &index_dir,
            &CancellationToken::noop(),
        )
        .unwrap();
        assert_eq!(engine.len(), 1);
        assert!(index_dir.is_dir());
        assert!(persistence::snapshot_path(&index_dir).exists());
    }

    #[test]
    fn cancelled_build_writes_no_snapshot() {
        let repo = RepoFixture::new();
        repo.jar("org.example", "foo", "1.0", &[]);

        let config = IndexConfig::default();
        let extractors = ExtractorSet::standard(&config).unwrap();
        let index_dir = config.index_dir(repo.root());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = build_index(repo.root(), &config, &extractors, &index_dir, &cancel)
            .err()
            .unwrap();
        assert!(matches!(error, IndexError::Cancelled));
        assert!(!persistence::snapshot_path(&index_dir).exists());
        assert!(!has_existing_index(&index_dir, config.min_index_entries));
    }

    #[test]
    fn refresh_adds_changes_and_deletes_vanished_files() {
        let repo = RepoFixture::new();
        repo.pom("org.example", "foo", "1.0", "jar", None, &[]);
        let old_jar = repo.jar("org.example", "foo", "1.0", &[]);

        let config = IndexConfig::default();
        let extractors = ExtractorSet::standard(&config).unwrap();
        let index_dir = config.index_dir(repo.root());
        let (mut engine, _) = build_index(
            repo.root(),
            &config,
            &extractors,
            &index_dir,
            &CancellationToken::noop(),
        )
        .unwrap();

        fs::remove_file(&old_jar).unwrap();
        repo.pom("org.example", "bar", "2.0", "pom", None, &[]);

        let result = refresh_index(
            repo.root(),
            &config,
            &extractors,
            &mut engine,
            &index_dir,
            &CancellationToken::noop(),
        )
        .unwrap();
        assert!(result.is_complete());
        assert_eq!(result.deleted_files, 1);
        assert_eq!(result.total_files, 2);
        assert_eq!(engine.len(), 2);

        let hits = engine
            .search(&EngineQuery::term("artifactId", "bar"))
            .unwrap();
        assert_eq!(hits.len(), 1);
        let hits = engine.search(&EngineQuery::term("extension", "jar")).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn refresh_reextracts_artifacts_beside_a_changed_descriptor() {
        let repo = RepoFixture::new();
        repo.pom("org.example", "foo", "1.0", "bundle", None, &[]);
        repo.jar("org.example", "foo", "1.0", &[]);

        let config = IndexConfig::default();
        let extractors = ExtractorSet::standard(&config).unwrap();
        let index_dir = config.index_dir(repo.root());
        let (mut engine, _) = build_index(
            repo.root(),
            &config,
            &extractors,
            &index_dir,
            &CancellationToken::noop(),
        )
        .unwrap();
        let bundles = engine.search(&EngineQuery::term("packaging", "bundle")).unwrap();
        assert_eq!(bundles.len(), 2);

        repo.pom("org.example", "foo", "1.0", "maven-plugin", None, &[]);
        refresh_index(
            repo.root(),
            &config,
            &extractors,
            &mut engine,
            &index_dir,
            &CancellationToken::noop(),
        )
        .unwrap();

        assert!(engine
            .search(&EngineQuery::term("packaging", "bundle"))
            .unwrap()
            .is_empty());
        let plugins = engine
            .search(&EngineQuery::term("packaging", "maven-plugin"))
            .unwrap();
        assert_eq!(plugins.len(), 2);
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn refresh_reextracts_artifacts_when_their_descriptor_vanishes() {
        let repo = RepoFixture::new();
        let pom = repo.pom("org.example", "foo", "1.0", "bundle", None, &[]);
        repo.jar("org.example", "foo", "1.0", &[]);

        let config = IndexConfig::default();
        let extractors = ExtractorSet::standard(&config).unwrap();
        let index_dir = config.index_dir(repo.root());
        let (mut engine, _) = build_index(
            repo.root(),
            &config,
            &extractors,
            &index_dir,
            &CancellationToken::noop(),
        )
        .unwrap();

        fs::remove_file(&pom).unwrap();
        let result = refresh_index(
            repo.root(),
            &config,
            &extractors,
            &mut engine,
            &index_dir,
            &CancellationToken::noop(),
        )
        .unwrap();
        assert_eq!(result.deleted_files, 1);
        assert_eq!(engine.len(), 1);
        assert!(engine
            .search(&EngineQuery::term("packaging", "bundle"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn interrupted_refresh_removes_snapshot() {
        let repo = RepoFixture::new();
        repo.jar("org.example", "foo", "1.0", &[]);

        let config = IndexConfig::default();
        let extractors = ExtractorSet::standard(&config).unwrap();
        let index_dir = config.index_dir(repo.root());
        let (mut engine, _) = build_index(
            repo.root(),
            &config,
            &extractors,
            &index_dir,
            &CancellationToken::noop(),
        )
        .unwrap();
        assert!(persistence::snapshot_path(&index_dir).exists());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = refresh_index(
            repo.root(),
            &config,
            &extractors,
            &mut engine,
            &index_dir,
            &cancel,
        )
        .unwrap();
        assert_eq!(result.outcome, ScanOutcome::Cancelled);
        assert!(!persistence::snapshot_path(&index_dir).exists());
    }
}
