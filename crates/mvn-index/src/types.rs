//! Artifact records and the descriptors handed to external callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coordinate::ArtifactCoordinate;
use crate::ontology;

/// Attribute name to value, as produced by extractors.
pub type Attributes = BTreeMap<String, String>;

/// Placeholder for an absent classifier inside `uinfo`.
const NO_CLASSIFIER: &str = "NA";

/// One indexed artifact file.
///
/// Several files of the same coordinate (a jar and its pom) yield separate
/// records. Records are deliberately not comparable: deduplicate on
/// [`ArtifactCoordinate::write`] or [`ArtifactRecord::uinfo`] instead.
#[derive(Debug, Clone)]
pub struct ArtifactRecord {
    coordinate: ArtifactCoordinate,
    extension: String,
    classifier: Option<String>,
    attributes: Attributes,
}

impl ArtifactRecord {
    pub fn new(
        coordinate: ArtifactCoordinate,
        extension: impl Into<String>,
        classifier: Option<String>,
    ) -> Self {
        Self {
            coordinate,
            extension: extension.into(),
            classifier: classifier.filter(|value| !value.is_empty()),
            attributes: Attributes::new(),
        }
    }

    pub fn coordinate(&self) -> &ArtifactCoordinate {
        &self.coordinate
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    /// Declared packaging, falling back to the file extension.
    pub fn packaging(&self) -> &str {
        self.attribute(ontology::PACKAGING.name)
            .unwrap_or(&self.extension)
    }

    pub fn checksum(&self) -> Option<&str> {
        self.attribute(ontology::SHA1.name)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub(crate) fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Unique identity of the file: `group|artifact|version|classifier|extension`.
    pub fn uinfo(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.coordinate.group_id(),
            self.coordinate.artifact_id(),
            self.coordinate.version(),
            self.classifier.as_deref().unwrap_or(NO_CLASSIFIER),
            self.extension
        )
    }

    pub fn descriptor(&self) -> ArtifactDescriptor {
        ArtifactDescriptor {
            group_id: self.coordinate.group_id().to_string(),
            artifact_id: self.coordinate.artifact_id().to_string(),
            version: self.coordinate.version().to_string(),
            packaging: self.packaging().to_string(),
            classifier: self.classifier.clone(),
            checksum: self.checksum().map(str::to_string),
        }
    }
}

/// Flat artifact summary returned by [`crate::gather_hierarchy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDescriptor {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: String,
    pub classifier: Option<String>,
    pub checksum: Option<String>,
}
