//! Turns discovered files into artifact contexts.
//!
//! The repository layout is `group/path/artifactId/version/file`, where the
//! file name is `artifactId-version[-classifier].extension`. Snapshot files
//! may carry a `yyyyMMdd.HHmmss-build` timestamp in place of `SNAPSHOT`.

use std::path::{Path, PathBuf};

use crate::coordinate::ArtifactCoordinate;
use crate::error::{IndexError, Result};
use crate::pom::PomModel;
use crate::types::ArtifactRecord;

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Suffixes of files that accompany artifacts but are not artifacts.
const SIDECAR_SUFFIXES: &[&str] = &[".sha1", ".md5", ".sha256", ".sha512", ".asc"];

/// Exact names of repository bookkeeping files.
const BOOKKEEPING_NAMES: &[&str] = &["_remote.repositories", "resolver-status.properties"];

/// Everything an extractor needs to know about one discovered file.
#[derive(Debug, Clone)]
pub struct ArtifactContext {
    pub file: PathBuf,
    /// Repository-relative path with `/` separators.
    pub relative_path: String,
    /// Sibling descriptor, when it exists. For a pom this is the file itself.
    pub descriptor_path: Option<PathBuf>,
    pub descriptor: Option<PomModel>,
    /// Identity stub; extractors fill in the attributes.
    pub record: ArtifactRecord,
}

impl ArtifactContext {
    pub fn is_descriptor(&self) -> bool {
        self.record.extension() == "pom"
    }
}

/// Parsed file name of an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileNameParts {
    /// `artifactId-fileVersion`, shared with the sibling descriptor.
    pub prefix: String,
    pub classifier: Option<String>,
    pub extension: String,
}

/// Builds [`ArtifactContext`]s for files below one repository root.
pub struct ArtifactContextProducer<'a> {
    root: &'a Path,
}

impl<'a> ArtifactContextProducer<'a> {
    pub fn new(root: &'a Path) -> Self {
        Self { root }
    }

    /// Returns `Ok(None)` for files that are not artifacts.
    ///
    /// A descriptor that cannot be parsed, or whose declared coordinate
    /// contradicts its location, is an error for the descriptor itself; for
    /// the artifact it accompanies it is only logged and dropped.
    pub fn produce(&self, file: &Path) -> Result<Option<ArtifactContext>> {
        let Ok(relative) = file.strip_prefix(self.root) else {
            return Ok(None);
        };
        let segments: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        if segments.len() < 4 {
            return Ok(None);
        }

        let file_name = &segments[segments.len() - 1];
        if !is_artifact_name(file_name) {
            return Ok(None);
        }
        let version = &segments[segments.len() - 2];
        let artifact_id = &segments[segments.len() - 3];
        let group_id = segments[..segments.len() - 3].join(".");

        let Some(parts) = parse_file_name(file_name, artifact_id, version) else {
            log::trace!("not an artifact file name: {}", file.display());
            return Ok(None);
        };
        let coordinate = match ArtifactCoordinate::new(group_id, artifact_id, version) {
            Ok(coordinate) => coordinate,
            Err(error) => {
                log::debug!("skipping {}: {error}", file.display());
                return Ok(None);
            }
        };

        let is_pom = parts.extension == "pom";
        let descriptor_path = if is_pom {
            Some(file.to_path_buf())
        } else {
            let sibling = file.with_file_name(format!("{}.pom", parts.prefix));
            sibling.is_file().then_some(sibling)
        };
        let descriptor = match &descriptor_path {
            Some(path) if is_pom => {
                let model = PomModel::read(path)?;
                if let Some(mismatch) = identity_mismatch(&model, &coordinate) {
                    return Err(IndexError::extraction(path, mismatch));
                }
                Some(model)
            }
            Some(path) => match PomModel::read(path) {
                Ok(model) => match identity_mismatch(&model, &coordinate) {
                    Some(mismatch) => {
                        log::warn!("ignoring descriptor of {}: {mismatch}", file.display());
                        None
                    }
                    None => Some(model),
                },
                Err(error) => {
                    log::warn!("ignoring descriptor of {}: {error}", file.display());
                    None
                }
            },
            None => None,
        };

        Ok(Some(ArtifactContext {
            file: file.to_path_buf(),
            relative_path: segments.join("/"),
            descriptor_path,
            descriptor,
            record: ArtifactRecord::new(coordinate, parts.extension, parts.classifier),
        }))
    }
}

/// Describes the first declared coordinate part that differs from the one
/// implied by the repository path. Omitted groupId and version are
/// inherited from the parent; unresolved `${...}` values are not compared.
fn identity_mismatch(model: &PomModel, coordinate: &ArtifactCoordinate) -> Option<String> {
    let parts = [
        ("groupId", model.effective_group_id(), coordinate.group_id()),
        ("artifactId", model.artifact_id.as_deref(), coordinate.artifact_id()),
        ("version", model.effective_version(), coordinate.version()),
    ];
    parts.into_iter().find_map(|(element, declared, stored)| {
        let declared = declared.filter(|value| !value.contains("${"))?;
        (declared != stored)
            .then(|| format!("descriptor declares {element} {declared} but is stored under {stored}"))
    })
}

fn is_artifact_name(name: &str) -> bool {
    !(SIDECAR_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
        || BOOKKEEPING_NAMES.contains(&name)
        || name.starts_with("maven-metadata"))
}

/// Splits `file_name` into prefix, classifier and extension, or `None` when
/// the name does not belong to `artifact_id`/`version`.
pub(crate) fn parse_file_name(
    file_name: &str,
    artifact_id: &str,
    version: &str,
) -> Option<FileNameParts> {
    let after_artifact = file_name.strip_prefix(artifact_id)?.strip_prefix('-')?;
    let file_version_len = if after_artifact.starts_with(version) {
        version.len()
    } else {
        let base = version.strip_suffix(SNAPSHOT_SUFFIX)?;
        let stamped = after_artifact.strip_prefix(base)?.strip_prefix('-')?;
        base.len() + 1 + snapshot_timestamp_len(stamped)?
    };

    let prefix_len = artifact_id.len() + 1 + file_version_len;
    let prefix = &file_name[..prefix_len];
    let rest = &file_name[prefix_len..];

    let (classifier, extension) = if let Some(rest) = rest.strip_prefix('-') {
        let (classifier, extension) = rest.split_once('.')?;
        (Some(classifier.to_string()), extension)
    } else {
        (None, rest.strip_prefix('.')?)
    };
    if extension.is_empty() || classifier.as_deref() == Some("") {
        return None;
    }

    Some(FileNameParts {
        prefix: prefix.to_string(),
        classifier,
        extension: extension.to_string(),
    })
}

/// Length of a leading `yyyyMMdd.HHmmss-N` timestamp.
fn snapshot_timestamp_len(value: &str) -> Option<usize> {
    let bytes = value.as_bytes();
    let digits = |range: std::ops::Range<usize>| {
        bytes.get(range).is_some_and(|slice| slice.iter().all(u8::is_ascii_digit))
    };
    if !(digits(0..8) && bytes.get(8) == Some(&b'.') && digits(9..15) && bytes.get(15) == Some(&b'-'))
    {
        return None;
    }
    let build_len = bytes[16..].iter().take_while(|b| b.is_ascii_digit()).count();
    (build_len > 0).then_some(16 + build_len)
}
