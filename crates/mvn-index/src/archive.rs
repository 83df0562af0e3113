//! Read-only view over artifact archives.
//!
//! Files that are not zip archives (descriptors, configuration files, or
//! anything without a zip signature) open as an explicit empty view rather
//! than failing, so extractors can treat them uniformly.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::{IndexError, Result};

const LOCAL_HEADER_MAGIC: [u8; 4] = *b"PK\x03\x04";
const EMPTY_ARCHIVE_MAGIC: [u8; 4] = *b"PK\x05\x06";

pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

/// Largest entry read into memory. Declared sizes are untrusted.
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

const MAX_ENTRY_PREALLOC: u64 = 64 * 1024;

enum Contents {
    Zip(ZipArchive<BufReader<File>>),
    Empty,
}

/// Entry listing and content access for one artifact file.
pub struct ArchiveReader {
    path: PathBuf,
    contents: Contents,
}

impl ArchiveReader {
    /// Opens `path`, returning the empty view for non-archives.
    pub fn open(path: &Path, non_archive_extensions: &[String]) -> Result<Self> {
        if !path.is_file() {
            return Err(IndexError::extraction(path, "not a regular file"));
        }
        if has_extension(path, non_archive_extensions) || !has_zip_signature(path)? {
            return Ok(Self::empty(path));
        }

        let file = File::open(path).map_err(|error| IndexError::extraction(path, error))?;
        let archive = ZipArchive::new(BufReader::new(file))
            .map_err(|error| IndexError::extraction(path, format!("unreadable archive: {error}")))?;
        Ok(Self {
            path: path.to_path_buf(),
            contents: Contents::Zip(archive),
        })
    }

    fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            contents: Contents::Empty,
        }
    }

    pub fn is_empty_view(&self) -> bool {
        matches!(self.contents, Contents::Empty)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry names in archive order. Empty for the empty view.
    pub fn entries(&self) -> Vec<String> {
        match &self.contents {
            Contents::Zip(archive) => archive.file_names().map(str::to_string).collect(),
            Contents::Empty => Vec::new(),
        }
    }

    pub fn has_entry(&self, name: &str) -> bool {
        match &self.contents {
            Contents::Zip(archive) => archive.index_for_name(name).is_some(),
            Contents::Empty => false,
        }
    }

    pub fn entry_bytes(&mut self, name: &str) -> Result<Vec<u8>> {
        let path = &self.path;
        let Contents::Zip(archive) = &mut self.contents else {
            return Err(IndexError::extraction(path, "not an archive"));
        };
        let mut entry = archive
            .by_name(name)
            .map_err(|error| IndexError::extraction(path, format!("entry {name}: {error}")))?;
        if entry.size() > MAX_ENTRY_BYTES {
            return Err(IndexError::extraction(
                path,
                format!("entry {name} declares {} bytes, limit is {MAX_ENTRY_BYTES}", entry.size()),
            ));
        }

        let mut bytes = Vec::with_capacity(entry.size().min(MAX_ENTRY_PREALLOC) as usize);
        (&mut entry)
            .take(MAX_ENTRY_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|error| IndexError::extraction(path, format!("entry {name}: {error}")))?;
        if bytes.len() as u64 > MAX_ENTRY_BYTES {
            return Err(IndexError::extraction(
                path,
                format!("entry {name} exceeds {MAX_ENTRY_BYTES} bytes"),
            ));
        }
        Ok(bytes)
    }

    /// Entry content decoded as UTF-8, replacing invalid sequences.
    pub fn entry_text(&mut self, name: &str) -> Result<String> {
        let bytes = self.entry_bytes(name)?;
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|error| String::from_utf8_lossy(error.as_bytes()).into_owned()))
    }
}

/// Case-insensitive match of the file name against dotless extensions.
pub(crate) fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    extensions.iter().any(|ext| {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        name.len() > ext.len() + 1 && name.ends_with(&ext) && name[..name.len() - ext.len()].ends_with('.')
    })
}

fn has_zip_signature(path: &Path) -> Result<bool> {
    let mut file = File::open(path).map_err(|error| IndexError::extraction(path, error))?;
    let mut magic = [0u8; 4];
    let mut read = 0;
    while read < magic.len() {
        match file.read(&mut magic[read..]) {
            Ok(0) => return Ok(false),
            Ok(n) => read += n,
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => {}
            Err(error) => return Err(IndexError::extraction(path, error)),
        }
    }
    Ok(magic == LOCAL_HEADER_MAGIC || magic == EMPTY_ARCHIVE_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_jar;
    use tempfile::TempDir;

    fn defaults() -> Vec<String> {
        crate::config::IndexConfig::default().non_archive_extensions
    }

    #[test]
    fn reads_entries_and_text() {
        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("foo-1.0.jar");
        write_jar(
            &jar,
            &[
                (MANIFEST_ENTRY, "Manifest-Version: 1.0\n"),
                ("com/example/Foo.class", "cafebabe"),
            ],
        );

        let mut reader = ArchiveReader::open(&jar, &defaults()).unwrap();
        assert!(!reader.is_empty_view());
        assert_eq!(reader.entries().len(), 2);
        assert!(reader.has_entry(MANIFEST_ENTRY));
        assert_eq!(
            reader.entry_text(MANIFEST_ENTRY).unwrap(),
            "Manifest-Version: 1.0\n"
        );
        assert!(matches!(
            reader.entry_bytes("missing"),
            Err(IndexError::Extraction { .. })
        ));
    }

    #[test]
    fn non_archives_open_as_empty_view() {
        let temp = TempDir::new().unwrap();
        let pom = temp.path().join("foo-1.0.pom");
        std::fs::write(&pom, "<project/>").unwrap();
        let config = temp.path().join("settings.xml");
        std::fs::write(&config, "PK\x03\x04 but still xml").unwrap();
        let tiny = temp.path().join("tiny.jar");
        std::fs::write(&tiny, "PK").unwrap();

        for path in [&pom, &config, &tiny] {
            let mut reader = ArchiveReader::open(path, &defaults()).unwrap();
            assert!(reader.is_empty_view(), "{}", path.display());
            assert!(reader.entries().is_empty());
            assert!(reader.entry_bytes(MANIFEST_ENTRY).is_err());
        }
    }

    /// Rewrites the uncompressed size of every entry, in both the local
    /// and the central headers, of a stored (uncompressed) archive.
    fn forge_declared_size(path: &Path, declared: u32) {
        let mut bytes = std::fs::read(path).unwrap();
        let patch = |bytes: &mut Vec<u8>, magic: &[u8; 4], offset: usize| {
            let mut at = 0;
            while let Some(found) = bytes[at..].windows(4).position(|w| w == magic) {
                let field = at + found + offset;
                bytes[field..field + 4].copy_from_slice(&declared.to_le_bytes());
                at += found + 4;
            }
        };
        patch(&mut bytes, b"PK\x03\x04", 22);
        patch(&mut bytes, b"PK\x01\x02", 24);
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn oversized_declared_entry_is_extraction_failure() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("forged-1.0.jar");
        let mut writer = zip::ZipWriter::new(File::create(&jar).unwrap());
        let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file(MANIFEST_ENTRY, stored).unwrap();
        writer.write_all(b"Manifest-Version: 1.0\n").unwrap();
        writer.finish().unwrap();
        forge_declared_size(&jar, 0xFFFF_FF00);

        let result = ArchiveReader::open(&jar, &defaults()).and_then(|mut reader| {
            reader.entry_text(MANIFEST_ENTRY)
        });
        assert!(matches!(result, Err(IndexError::Extraction { .. })));
    }

    #[test]
    fn corrupt_archive_is_extraction_failure() {
        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("broken-1.0.jar");
        std::fs::write(&jar, b"PK\x03\x04garbage that is not a zip").unwrap();

        let error = ArchiveReader::open(&jar, &defaults()).err().unwrap();
        assert!(matches!(error, IndexError::Extraction { .. }));
    }

    #[test]
    fn missing_file_is_extraction_failure() {
        let temp = TempDir::new().unwrap();
        let error = ArchiveReader::open(&temp.path().join("gone.jar"), &defaults())
            .err()
            .unwrap();
        assert!(matches!(error, IndexError::Extraction { .. }));
    }

    #[test]
    fn extension_matching() {
        let exts = defaults();
        assert!(has_extension(Path::new("a/b.tar.gz"), &exts));
        assert!(has_extension(Path::new("pom.XML"), &exts));
        assert!(!has_extension(Path::new("xml"), &exts));
        assert!(!has_extension(Path::new("a.jar"), &exts));
    }
}
