//! Descriptor (`pom.xml`) model.
//!
//! Only the handful of elements the index needs are read: the project
//! identity, packaging, name, description, parent reference and module list.
//! Elements nested elsewhere (profiles, dependency management) are ignored.

use std::fmt::Display;
use std::fs;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::coordinate::ArtifactCoordinate;
use crate::error::{IndexError, Result};

pub const DEFAULT_PACKAGING: &str = "jar";

/// `<parent>` reference of a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl ParentRef {
    pub fn coordinate(&self) -> Result<ArtifactCoordinate> {
        ArtifactCoordinate::new(&self.group_id, &self.artifact_id, &self.version)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomModel {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent: Option<ParentRef>,
    pub modules: Vec<String>,
}

impl PomModel {
    pub fn read(path: &Path) -> Result<Self> {
        let xml = fs::read_to_string(path).map_err(|error| IndexError::extraction(path, error))?;
        Self::parse(&xml).map_err(|error| IndexError::extraction(path, error))
    }

    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut model = Self::default();
        let mut parent = ParentRef::default();
        let mut has_parent = false;
        let mut path: Vec<String> = Vec::new();
        let mut text = String::new();

        loop {
            match reader.read_event().map_err(malformed)? {
                Event::Start(start) => {
                    path.push(String::from_utf8_lossy(start.local_name().as_ref()).into_owned());
                    text.clear();
                }
                Event::Text(content) => {
                    text.push_str(&content.unescape().map_err(malformed)?);
                }
                Event::CData(content) => {
                    text.push_str(&String::from_utf8_lossy(&content.into_inner()));
                }
                Event::End(_) => {
                    let value = text.trim();
                    let segments: Vec<&str> = path.iter().map(String::as_str).collect();
                    match segments.as_slice() {
                        ["project", "groupId"] => model.group_id = non_empty(value),
                        ["project", "artifactId"] => model.artifact_id = non_empty(value),
                        ["project", "version"] => model.version = non_empty(value),
                        ["project", "packaging"] => model.packaging = non_empty(value),
                        ["project", "name"] => model.name = non_empty(value),
                        ["project", "description"] => model.description = non_empty(value),
                        ["project", "parent"] => has_parent = true,
                        ["project", "parent", "groupId"] => parent.group_id = value.to_string(),
                        ["project", "parent", "artifactId"] => {
                            parent.artifact_id = value.to_string()
                        }
                        ["project", "parent", "version"] => parent.version = value.to_string(),
                        ["project", "modules", "module"] if !value.is_empty() => {
                            model.modules.push(value.to_string())
                        }
                        _ => {}
                    }
                    path.pop();
                    text.clear();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if has_parent {
            model.parent = Some(parent);
        }
        if model.artifact_id.is_none() {
            return Err(malformed("missing project artifactId"));
        }
        Ok(model)
    }

    /// Own groupId, inherited from the parent when omitted.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|parent| parent.group_id.as_str()))
            .filter(|value| !value.is_empty())
    }

    /// Own version, inherited from the parent when omitted.
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|parent| parent.version.as_str()))
            .filter(|value| !value.is_empty())
    }

    pub fn packaging(&self) -> &str {
        self.packaging.as_deref().unwrap_or(DEFAULT_PACKAGING)
    }

    /// Parent coordinate, if the reference is complete and well-formed.
    pub fn parent_coordinate(&self) -> Option<ArtifactCoordinate> {
        let parent = self.parent.as_ref()?;
        match parent.coordinate() {
            Ok(coordinate) => Some(coordinate),
            Err(error) => {
                log::debug!("ignoring unusable parent reference: {error}");
                None
            }
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn malformed(error: impl Display) -> IndexError {
    IndexError::InvalidInput(format!("malformed descriptor: {error}"))
}
