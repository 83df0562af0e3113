use super::MetadataExtractor;
use crate::archive::{ArchiveReader, MANIFEST_ENTRY};
use crate::config::IndexConfig;
use crate::error::Result;
use crate::ontology::{self, Field};
use crate::scanner::ArtifactContext;
use crate::types::Attributes;

const FIELDS: &[Field] = &[ontology::MANIFEST];

/// Full manifest text of archives. Stored, never searchable.
pub struct ManifestExtractor {
    non_archive_extensions: Vec<String>,
}

impl ManifestExtractor {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            non_archive_extensions: config.non_archive_extensions.clone(),
        }
    }
}

impl MetadataExtractor for ManifestExtractor {
    fn id(&self) -> &'static str {
        "deps/jar-manifest"
    }

    fn fields(&self) -> &'static [Field] {
        FIELDS
    }

    fn extract(&self, context: &ArtifactContext) -> Result<Option<Attributes>> {
        if context.is_descriptor() {
            return Ok(None);
        }
        let mut archive = ArchiveReader::open(&context.file, &self.non_archive_extensions)?;
        if !archive.has_entry(MANIFEST_ENTRY) {
            return Ok(None);
        }
        let text = archive.entry_text(MANIFEST_ENTRY)?;

        let mut attributes = Attributes::new();
        attributes.insert(ontology::MANIFEST.name.to_string(), text);
        Ok(Some(attributes))
    }
}
