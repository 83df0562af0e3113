//! Artifact coordinates and their canonical string form.
//!
//! A coordinate is the `(groupId, artifactId, version)` triple shared by all
//! files of one artifact family. Its canonical form is
//! `mvn:groupId/artifactId/version`, which is also the value stored in the
//! `parent` field of child artifacts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Namespace prefix of the canonical coordinate string.
pub const COORDINATE_NAMESPACE: &str = "mvn";

/// Immutable `(groupId, artifactId, version)` triple.
///
/// Ordering is lexicographic over group, then artifact, then version.
/// Serializes as the canonical string, so deserialization validates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactCoordinate {
    group_id: String,
    artifact_id: String,
    version: String,
}

impl ArtifactCoordinate {
    /// Creates a coordinate, rejecting empty segments and segments that could
    /// not survive a `write`/`parse` round trip.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self> {
        let group_id = group_id.into();
        let artifact_id = artifact_id.into();
        let version = version.into();
        if !is_valid_segment(&group_id)
            || !is_valid_segment(&artifact_id)
            || !is_valid_segment(&version)
        {
            return Err(IndexError::InvalidInput(format!(
                "invalid GAV info, g = '{group_id}', a = '{artifact_id}', v = '{version}'"
            )));
        }
        Ok(Self {
            group_id,
            artifact_id,
            version,
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Parses the canonical `mvn:groupId/artifactId/version` form.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || IndexError::InvalidInput(format!("invalid coordinate string: {value}"));

        let rest = value
            .strip_prefix(COORDINATE_NAMESPACE)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(invalid)?;
        let mut parts = rest.split('/');
        let (Some(group_id), Some(artifact_id), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        Self::new(group_id, artifact_id, version).map_err(|_| invalid())
    }

    /// Writes the canonical string form.
    pub fn write(&self) -> String {
        format!(
            "{COORDINATE_NAMESPACE}:{}/{}/{}",
            self.group_id, self.artifact_id, self.version
        )
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.write())
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = IndexError;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<String> for ArtifactCoordinate {
    type Error = IndexError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ArtifactCoordinate> for String {
    fn from(coordinate: ArtifactCoordinate) -> Self {
        coordinate.write()
    }
}

/// Segments start with an alphanumeric character and otherwise contain only
/// alphanumerics, `.`, `-` and `_`.
fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}
