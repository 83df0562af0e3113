//! Document storage and retrieval behind the [`IndexEngine`] trait.
//!
//! The rest of the crate only talks to the engine through the trait:
//! documents in, compiled [`EngineQuery`]s against them, and an explicit
//! `commit` that makes the current state durable.

mod document;
pub mod persistence;
mod query;
mod schema;
mod snapshot;

pub use document::Document;
pub use query::{Clause, EngineQuery, Occurrence};
pub use schema::Schema;
pub use snapshot::SnapshotIndex;

use crate::error::Result;

/// Storage engine collaborator.
///
/// One writer at a time; concurrent readers are allowed between writes.
pub trait IndexEngine: Send + Sync {
    fn add_document(&mut self, document: Document) -> Result<()>;

    /// Deletes every document whose `field` holds exactly `value`.
    /// Returns the number of documents removed.
    fn delete_documents(&mut self, field: &str, value: &str) -> Result<usize>;

    /// Matching documents in insertion order.
    fn search(&self, query: &EngineQuery) -> Result<Vec<Document>>;

    /// All live documents in insertion order.
    fn documents(&self) -> Vec<Document>;

    /// Persists all changes since the last commit.
    fn commit(&mut self) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
