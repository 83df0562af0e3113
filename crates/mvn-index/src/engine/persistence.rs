//! Snapshot persistence for the document index.
//!
//! Documents are postcard-encoded and zstd-compressed into
//! `<index_dir>/index.bin.zst`. Postings are not persisted; they are rebuilt
//! from the documents on load.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::thread::available_parallelism;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::document::Document;
use super::schema::Schema;
use crate::error::{IndexError, Result};

/// Snapshot format version - increment when changing the format.
pub const INDEX_SNAPSHOT_VERSION: u32 = 1;

pub const SNAPSHOT_FILE_NAME: &str = "index.bin.zst";

#[derive(Serialize, Deserialize)]
pub struct PersistentIndex {
    pub version: u32,
    /// Field name and policy bits the documents were indexed with.
    pub schema: Vec<(String, u8)>,
    pub documents: Vec<Document>,
    /// Seconds since the epoch.
    pub saved_at: u64,
}

pub fn snapshot_path(index_dir: &Path) -> PathBuf {
    index_dir.join(SNAPSHOT_FILE_NAME)
}

pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Write operations
// ---------------------------------------------------------------------------

/// Writes a snapshot: postcard, zstd level 6 (multi-threaded), then an
/// atomic rename over the previous file.
pub fn write_snapshot(index_dir: &Path, schema: &Schema, documents: Vec<Document>) -> Result<()> {
    let count = documents.len();
    let storage = PersistentIndex {
        version: INDEX_SNAPSHOT_VERSION,
        schema: schema.to_persisted(),
        documents,
        saved_at: unix_now_secs(),
    };

    fs::create_dir_all(index_dir).map_err(|error| {
        IndexError::Engine(format!(
            "failed to create index directory {}: {error}",
            index_dir.display()
        ))
    })?;

    let path = snapshot_path(index_dir);
    let tmp_path = path.with_extension("tmp");

    {
        let output = File::create(&tmp_path).map_err(|error| {
            IndexError::Engine(format!(
                "failed to create snapshot file {}: {error}",
                tmp_path.display()
            ))
        })?;

        let mut encoder = zstd::Encoder::new(output, 6)
            .map_err(|error| IndexError::Engine(format!("failed to create zstd encoder: {error}")))?;

        let threads = available_parallelism().map(|x| x.get() as u32).unwrap_or(4);
        encoder.multithread(threads).map_err(|error| {
            IndexError::Engine(format!("failed to enable multi-threaded zstd: {error}"))
        })?;

        let mut output = BufWriter::new(encoder);
        postcard::to_io(&storage, &mut output).map_err(|error| {
            IndexError::Engine(format!("failed to encode snapshot with postcard: {error}"))
        })?;

        // The frame must be complete before the rename publishes it.
        let encoder = output.into_inner().map_err(|error| {
            IndexError::Engine(format!("failed to flush snapshot: {}", error.error()))
        })?;
        encoder.finish().map_err(|error| {
            IndexError::Engine(format!("failed to finish zstd frame: {error}"))
        })?;
    }

    fs::rename(&tmp_path, &path).map_err(|error| {
        IndexError::Engine(format!(
            "failed to finalize snapshot file {}: {error}",
            path.display()
        ))
    })?;

    log::debug!("wrote index snapshot to {} ({count} documents)", path.display());
    Ok(())
}

/// Removes the snapshot so the next open rebuilds the index.
pub fn remove_snapshot(index_dir: &Path) -> Result<()> {
    match fs::remove_file(snapshot_path(index_dir)) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(error) => Err(IndexError::Engine(format!(
            "failed to remove snapshot in {}: {error}",
            index_dir.display()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Read operations
// ---------------------------------------------------------------------------

/// Loads the documents of a snapshot written with `schema`.
///
/// Returns `None` when the snapshot is missing, unreadable, of another
/// format version, or was written with a different schema.
pub fn load_snapshot(index_dir: &Path, schema: &Schema) -> Option<Vec<Document>> {
    let path = snapshot_path(index_dir);
    let input = match File::open(&path) {
        Ok(file) => file,
        Err(error) if error.kind() == ErrorKind::NotFound => return None,
        Err(error) => {
            log::warn!("index snapshot read failed for {}: {error}", path.display());
            return None;
        }
    };

    let decoder = match zstd::Decoder::new(input) {
        Ok(d) => d,
        Err(error) => {
            log::warn!(
                "index snapshot decompress failed for {}: {error}",
                path.display()
            );
            return None;
        }
    };

    let mut input = BufReader::new(decoder);
    let mut scratch = vec![0u8; 4 * 1024];

    let storage: PersistentIndex = match postcard::from_io((&mut input, &mut scratch)) {
        Ok((s, _)) => s,
        Err(error) => {
            log::warn!("index snapshot decode failed for {}: {error}", path.display());
            return None;
        }
    };

    if storage.version != INDEX_SNAPSHOT_VERSION {
        log::debug!(
            "snapshot version mismatch: {} != {}",
            storage.version,
            INDEX_SNAPSHOT_VERSION
        );
        return None;
    }

    if storage.schema != schema.to_persisted() {
        log::debug!("snapshot schema mismatch in {}", path.display());
        return None;
    }

    log::debug!(
        "loaded index snapshot from {} ({} documents, saved at {})",
        path.display(),
        storage.documents.len(),
        storage.saved_at
    );
    Some(storage.documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology;
    use tempfile::TempDir;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.register(&ontology::GROUP_ID).unwrap();
        schema.register(&ontology::MANIFEST).unwrap();
        schema
    }

    fn doc(group: &str) -> Document {
        let mut doc = Document::new();
        doc.add("groupId", group);
        doc.add("manifest", "Manifest-Version: 1.0");
        doc
    }

    #[test]
    fn write_then_load() {
        let temp = TempDir::new().unwrap();
        write_snapshot(temp.path(), &schema(), vec![doc("a"), doc("b")]).unwrap();

        let loaded = load_snapshot(temp.path(), &schema()).unwrap();
        assert_eq!(loaded, vec![doc("a"), doc("b")]);
        assert!(!temp.path().join("index.bin.tmp").exists());
    }

    #[test]
    fn written_snapshot_is_a_complete_zstd_frame() {
        let temp = TempDir::new().unwrap();
        let documents: Vec<Document> = (0..500).map(|i| doc(&format!("group{i}"))).collect();
        write_snapshot(temp.path(), &schema(), documents).unwrap();

        let raw = zstd::decode_all(File::open(snapshot_path(temp.path())).unwrap()).unwrap();
        let (decoded, rest): (PersistentIndex, &[u8]) = postcard::take_from_bytes(&raw).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded.documents.len(), 500);
    }

    #[test]
    fn missing_or_corrupt_snapshot_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(load_snapshot(temp.path(), &schema()).is_none());

        fs::write(snapshot_path(temp.path()), b"not zstd").unwrap();
        assert!(load_snapshot(temp.path(), &schema()).is_none());
    }

    #[test]
    fn schema_change_invalidates_snapshot() {
        let temp = TempDir::new().unwrap();
        write_snapshot(temp.path(), &schema(), vec![doc("a")]).unwrap();

        let mut wider = schema();
        wider.register(&ontology::PACKAGES).unwrap();
        assert!(load_snapshot(temp.path(), &wider).is_none());
    }

    #[test]
    fn remove_is_idempotent() {
        let temp = TempDir::new().unwrap();
        write_snapshot(temp.path(), &schema(), Vec::new()).unwrap();
        remove_snapshot(temp.path()).unwrap();
        remove_snapshot(temp.path()).unwrap();
        assert!(!snapshot_path(temp.path()).exists());
    }
}
