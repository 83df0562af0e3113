//! Metadata extractors.
//!
//! Each extractor owns a fixed set of document fields, derives their values
//! from an [`ArtifactContext`] and converts them to and from engine
//! documents. [`ExtractorSet`] runs the registered extractors in dependency
//! order and enforces field ownership.

mod hierarchy;
mod manifest;
mod minimal;
mod packages;

use fnv::{FnvHashMap, FnvHashSet};

pub use hierarchy::HierarchyExtractor;
pub use manifest::ManifestExtractor;
pub use minimal::{MinimalExtractor, MINIMAL_ID};
pub(crate) use minimal::modified_millis;
pub use packages::PackageExtractor;

use crate::config::IndexConfig;
use crate::coordinate::ArtifactCoordinate;
use crate::engine::{Document, Schema};
use crate::error::{IndexError, Result};
use crate::ontology::{self, Field};
use crate::scanner::ArtifactContext;
use crate::types::{ArtifactRecord, Attributes};

/// Derives and (de)serializes one group of record attributes.
pub trait MetadataExtractor: Send + Sync {
    fn id(&self) -> &'static str;

    /// Extractors that must run before this one.
    fn depends_on(&self) -> &'static [&'static str] {
        &[MINIMAL_ID]
    }

    /// Fields this extractor owns.
    fn fields(&self) -> &'static [Field];

    /// Returns `None` when the file carries none of this extractor's metadata.
    fn extract(&self, context: &ArtifactContext) -> Result<Option<Attributes>>;

    fn write_to_document(&self, record: &ArtifactRecord, document: &mut Document) {
        for field in self.fields() {
            if let Some(value) = record.attribute(field.name) {
                document.add(field.name, value);
            }
        }
    }

    /// Copies owned fields from `document`; returns whether anything was set.
    fn read_from_document(&self, document: &Document, record: &mut ArtifactRecord) -> bool {
        let mut wrote = false;
        for field in self.fields() {
            if let Some(value) = document.get(field.name) {
                record.set_attribute(field.name, value);
                wrote = true;
            }
        }
        wrote
    }
}

/// Extractors in execution order.
pub struct ExtractorSet {
    extractors: Vec<Box<dyn MetadataExtractor>>,
    schema: Schema,
}

impl ExtractorSet {
    /// Orders `extractors` so every extractor runs after its dependencies.
    pub fn new(extractors: Vec<Box<dyn MetadataExtractor>>) -> Result<Self> {
        let extractors = order_by_dependencies(extractors)?;
        let mut schema = Schema::new();
        for extractor in &extractors {
            for field in extractor.fields() {
                schema.register(field)?;
            }
        }
        Ok(Self { extractors, schema })
    }

    /// The minimal extractor plus hierarchy, manifest and package extraction.
    pub fn standard(config: &IndexConfig) -> Result<Self> {
        Self::new(vec![
            Box::new(PackageExtractor::new(config)),
            Box::new(ManifestExtractor::new(config)),
            Box::new(HierarchyExtractor),
            Box::new(MinimalExtractor),
        ])
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|extractor| extractor.id()).collect()
    }

    /// Runs every extractor over `context`, merging only owned fields.
    pub fn populate(&self, context: &ArtifactContext) -> Result<ArtifactRecord> {
        let mut record = context.record.clone();
        for extractor in &self.extractors {
            let Some(attributes) = extractor.extract(context)? else {
                continue;
            };
            let owned = extractor.fields();
            for (key, value) in attributes {
                if owned.iter().any(|field| field.name == key) {
                    record.set_attribute(key, value);
                } else {
                    log::warn!(
                        "extractor {} produced unowned attribute {key} for {}",
                        extractor.id(),
                        context.file.display()
                    );
                }
            }
        }
        Ok(record)
    }

    pub fn to_document(&self, record: &ArtifactRecord) -> Document {
        let mut document = Document::new();
        for extractor in &self.extractors {
            extractor.write_to_document(record, &mut document);
        }
        document
    }

    /// Rebuilds a record from a stored document; `None` without identity fields.
    pub fn record_from_document(&self, document: &Document) -> Option<ArtifactRecord> {
        let coordinate = ArtifactCoordinate::new(
            document.get(ontology::GROUP_ID.name)?,
            document.get(ontology::ARTIFACT_ID.name)?,
            document.get(ontology::VERSION.name)?,
        )
        .ok()?;
        let extension = document.get(ontology::EXTENSION.name)?;
        let classifier = document.get(ontology::CLASSIFIER.name).map(str::to_string);

        let mut record = ArtifactRecord::new(coordinate, extension, classifier);
        for extractor in &self.extractors {
            extractor.read_from_document(document, &mut record);
        }
        Some(record)
    }
}

fn order_by_dependencies(
    extractors: Vec<Box<dyn MetadataExtractor>>,
) -> Result<Vec<Box<dyn MetadataExtractor>>> {
    let known: FnvHashSet<&'static str> = extractors.iter().map(|e| e.id()).collect();
    if known.len() != extractors.len() {
        return Err(IndexError::InvalidInput(
            "duplicate extractor id".to_string(),
        ));
    }
    for extractor in &extractors {
        if let Some(missing) = extractor
            .depends_on()
            .iter()
            .find(|dependency| !known.contains(*dependency))
        {
            return Err(IndexError::InvalidInput(format!(
                "extractor {} depends on unknown extractor {missing}",
                extractor.id()
            )));
        }
    }

    let mut pending: FnvHashMap<&'static str, Box<dyn MetadataExtractor>> =
        extractors.into_iter().map(|e| (e.id(), e)).collect();
    let mut ordered = Vec::with_capacity(pending.len());
    let mut placed: FnvHashSet<&'static str> = FnvHashSet::default();

    while !pending.is_empty() {
        let mut ready: Vec<&'static str> = pending
            .values()
            .filter(|e| e.depends_on().iter().all(|d| placed.contains(d)))
            .map(|e| e.id())
            .collect();
        if ready.is_empty() {
            let mut stuck: Vec<_> = pending.keys().copied().collect();
            stuck.sort_unstable();
            return Err(IndexError::InvalidInput(format!(
                "extractor dependency cycle among {}",
                stuck.join(", ")
            )));
        }
        ready.sort_unstable();
        for id in ready {
            if let Some(extractor) = pending.remove(id) {
                placed.insert(id);
                ordered.push(extractor);
            }
        }
    }
    Ok(ordered)
}
