use std::collections::BTreeSet;

use super::MetadataExtractor;
use crate::archive::ArchiveReader;
use crate::config::IndexConfig;
use crate::error::Result;
use crate::ontology::{self, Field};
use crate::scanner::ArtifactContext;
use crate::types::Attributes;

const FIELDS: &[Field] = &[ontology::PACKAGES];

const CLASS_SUFFIX: &str = ".class";

/// Packages of the classes contained in an archive.
pub struct PackageExtractor {
    non_archive_extensions: Vec<String>,
}

impl PackageExtractor {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            non_archive_extensions: config.non_archive_extensions.clone(),
        }
    }
}

impl MetadataExtractor for PackageExtractor {
    fn id(&self) -> &'static str {
        "deps/jar-packages"
    }

    fn fields(&self) -> &'static [Field] {
        FIELDS
    }

    fn extract(&self, context: &ArtifactContext) -> Result<Option<Attributes>> {
        if context.is_descriptor() {
            return Ok(None);
        }
        let archive = ArchiveReader::open(&context.file, &self.non_archive_extensions)?;
        let packages = packages_of(archive.entries().iter().map(String::as_str));
        if packages.is_empty() {
            return Ok(None);
        }

        let mut attributes = Attributes::new();
        attributes.insert(ontology::PACKAGES.name.to_string(), packages.join(","));
        Ok(Some(attributes))
    }
}

/// Distinct dotted packages of `*.class` entries, in sorted order.
/// Classes in the archive root have no package and are skipped.
pub(crate) fn packages_of<'a>(entries: impl Iterator<Item = &'a str>) -> Vec<String> {
    entries
        .filter(|entry| entry.ends_with(CLASS_SUFFIX))
        .filter_map(|entry| entry.rsplit_once('/'))
        .map(|(directory, _)| directory.replace('/', "."))
        .filter(|package| !package.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
