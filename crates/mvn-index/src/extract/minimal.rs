//! Identity, checksum and descriptor summary of every artifact file.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::UNIX_EPOCH;

use sha1::{Digest, Sha1};

use super::MetadataExtractor;
use crate::error::{IndexError, Result};
use crate::ontology::{self, Field};
use crate::scanner::ArtifactContext;
use crate::types::Attributes;

pub const MINIMAL_ID: &str = "min";

const FIELDS: &[Field] = &[
    ontology::GROUP_ID,
    ontology::ARTIFACT_ID,
    ontology::VERSION,
    ontology::PACKAGING,
    ontology::EXTENSION,
    ontology::CLASSIFIER,
    ontology::SHA1,
    ontology::SIZE,
    ontology::LAST_MODIFIED,
    ontology::NAME,
    ontology::DESCRIPTION,
    ontology::UINFO,
    ontology::FILE_PATH,
];

pub struct MinimalExtractor;

impl MetadataExtractor for MinimalExtractor {
    fn id(&self) -> &'static str {
        MINIMAL_ID
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[]
    }

    fn fields(&self) -> &'static [Field] {
        FIELDS
    }

    fn extract(&self, context: &ArtifactContext) -> Result<Option<Attributes>> {
        let record = &context.record;
        let coordinate = record.coordinate();
        let metadata = fs::metadata(&context.file)
            .map_err(|error| IndexError::extraction(&context.file, error))?;

        let mut attributes = Attributes::new();
        let mut put = |field: &Field, value: String| {
            attributes.insert(field.name.to_string(), value);
        };
        put(&ontology::GROUP_ID, coordinate.group_id().to_string());
        put(&ontology::ARTIFACT_ID, coordinate.artifact_id().to_string());
        put(&ontology::VERSION, coordinate.version().to_string());
        put(&ontology::EXTENSION, record.extension().to_string());
        if let Some(classifier) = record.classifier() {
            put(&ontology::CLASSIFIER, classifier.to_string());
        }
        put(&ontology::PACKAGING, packaging(context));
        put(&ontology::SHA1, checksum(&context.file)?);
        put(&ontology::SIZE, metadata.len().to_string());
        if let Some(millis) = modified_millis(&metadata) {
            put(&ontology::LAST_MODIFIED, millis);
        }
        if let Some(descriptor) = &context.descriptor {
            if let Some(name) = &descriptor.name {
                put(&ontology::NAME, name.clone());
            }
            if let Some(description) = &descriptor.description {
                put(&ontology::DESCRIPTION, description.clone());
            }
        }
        put(&ontology::UINFO, record.uinfo());
        put(&ontology::FILE_PATH, context.relative_path.clone());

        Ok(Some(attributes))
    }
}

/// Modification time in milliseconds since the epoch, as stored.
pub(crate) fn modified_millis(metadata: &fs::Metadata) -> Option<String> {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_millis().to_string())
}

/// Classified files are typed by extension; main files by their descriptor.
fn packaging(context: &ArtifactContext) -> String {
    let record = &context.record;
    if record.classifier().is_some() {
        return record.extension().to_string();
    }
    match &context.descriptor {
        Some(descriptor) => descriptor.packaging().to_string(),
        None => record.extension().to_string(),
    }
}

/// SHA-1 from a `.sha1` sidecar when it holds a valid digest, else computed.
fn checksum(path: &Path) -> Result<String> {
    let mut sidecar = path.as_os_str().to_owned();
    sidecar.push(".sha1");
    if let Ok(text) = fs::read_to_string(&sidecar) {
        if let Some(digest) = text.split_whitespace().next() {
            if digest.len() == 40 && digest.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Ok(digest.to_ascii_lowercase());
            }
        }
        log::debug!("ignoring malformed checksum sidecar for {}", path.display());
    }

    let file = File::open(path).map_err(|error| IndexError::extraction(path, error))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha1::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|error| IndexError::extraction(path, error))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}
