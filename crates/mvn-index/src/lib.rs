//! Local Maven repository indexing and hierarchy search.
//!
//! This crate provides:
//! - Ordered repository scanning with per-file metadata extraction
//! - A persisted field index over artifact attributes
//! - A small criteria algebra compiled to index queries
//! - Breadth-first reconstruction of parent/module hierarchies

pub mod archive;
pub mod cancel;
pub mod config;
pub mod coordinate;
pub mod criteria;
pub mod engine;
pub mod error;
pub mod extract;
pub mod hierarchy;
pub mod index;
pub mod ontology;
pub mod pom;
pub mod scanner;
pub mod types;
pub mod version;

#[cfg(test)]
mod testutil;

// Re-export main types
pub use cancel::CancellationToken;
pub use config::{IndexConfig, RepoLocation};
pub use coordinate::ArtifactCoordinate;
pub use criteria::{compile, CriteriaOptions, Criterion, MatchMode, Occurrence};
pub use error::{IndexError, Result};
pub use hierarchy::{gather_hierarchy, Hierarchy, HierarchyResolver};
pub use index::IndexContext;
pub use scanner::{RepositoryScanner, ScanListener, ScanOutcome, ScanResult, ScanSummary};
pub use types::{ArtifactDescriptor, ArtifactRecord};
pub use version::{ArtifactFilter, MavenVersion, VersionRange};
