//! Document field catalogue.
//!
//! Every attribute an extractor may write is declared here together with its
//! indexing policy. The engine schema is assembled from the fields of the
//! registered extractors, so a field no extractor owns is never indexed.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// How a field is kept by the index engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldPolicy: u8 {
        /// The raw value is kept and returned with the document.
        const STORED = 0b001;
        /// The value is searchable.
        const INDEXED = 0b010;
        /// Searchable values are split into lowercased tokens.
        const TOKENIZED = 0b100;

        const KEYWORD = Self::STORED.bits() | Self::INDEXED.bits();
        const TEXT = Self::STORED.bits() | Self::INDEXED.bits() | Self::TOKENIZED.bits();
    }
}

impl FieldPolicy {
    #[inline]
    pub fn is_searchable(self) -> bool {
        self.contains(Self::INDEXED)
    }

    #[inline]
    pub fn is_tokenized(self) -> bool {
        self.contains(Self::INDEXED | Self::TOKENIZED)
    }
}

/// A named document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: &'static str,
    pub description: &'static str,
    pub policy: FieldPolicy,
}

impl Field {
    pub const fn new(name: &'static str, description: &'static str, policy: FieldPolicy) -> Self {
        Self {
            name,
            description,
            policy,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ---------------------------------------------------------------------------
// Core fields
// ---------------------------------------------------------------------------

pub const GROUP_ID: Field = Field::new("groupId", "Artifact group", FieldPolicy::KEYWORD);
pub const ARTIFACT_ID: Field = Field::new("artifactId", "Artifact id", FieldPolicy::KEYWORD);
pub const VERSION: Field = Field::new("version", "Artifact version", FieldPolicy::KEYWORD);
pub const PACKAGING: Field = Field::new("packaging", "Declared packaging", FieldPolicy::KEYWORD);
pub const EXTENSION: Field = Field::new("extension", "File extension", FieldPolicy::KEYWORD);
pub const CLASSIFIER: Field = Field::new("classifier", "Artifact classifier", FieldPolicy::KEYWORD);
pub const SHA1: Field = Field::new("sha1", "SHA-1 checksum of the file", FieldPolicy::KEYWORD);
pub const SIZE: Field = Field::new("size", "File size in bytes", FieldPolicy::STORED);
pub const LAST_MODIFIED: Field = Field::new(
    "lastModified",
    "File modification time, milliseconds since the epoch",
    FieldPolicy::STORED,
);
pub const NAME: Field = Field::new("name", "Project name", FieldPolicy::TEXT);
pub const DESCRIPTION: Field = Field::new("description", "Project description", FieldPolicy::TEXT);
pub const UINFO: Field = Field::new(
    "uinfo",
    "Unique artifact identity: group|artifact|version|classifier|extension",
    FieldPolicy::KEYWORD,
);
/// Repository-relative path of the indexed file.
pub const FILE_PATH: Field = Field::new("path", "Repository-relative file path", FieldPolicy::KEYWORD);

// ---------------------------------------------------------------------------
// Dependency metadata fields
// ---------------------------------------------------------------------------

pub const PARENT: Field = Field::new(
    "parent",
    "Canonical coordinate of the parent artifact",
    FieldPolicy::KEYWORD,
);
pub const MODULES: Field = Field::new(
    "modules",
    "Comma-separated list of declared module names",
    FieldPolicy::KEYWORD,
);
pub const MANIFEST: Field = Field::new(
    "manifest",
    "Full text of the archive manifest",
    FieldPolicy::STORED,
);
pub const PACKAGES: Field = Field::new(
    "packages",
    "Comma-separated list of packages contained in the archive",
    FieldPolicy::TEXT,
);
