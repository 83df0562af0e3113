//! In-memory document index with per-field postings, persisted as a snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::document::Document;
use super::persistence;
use super::query::{Clause, EngineQuery, Occurrence};
use super::schema::Schema;
use super::IndexEngine;
use crate::error::{IndexError, Result};
use crate::ontology::FieldPolicy;

type DocId = u32;
type Postings = BTreeMap<String, BTreeSet<DocId>>;

/// Document table plus an inverted index over searchable fields.
///
/// Deleted documents leave a hole in the table so ids stay stable until the
/// next load, which compacts.
pub struct SnapshotIndex {
    index_dir: PathBuf,
    schema: Schema,
    documents: Vec<Option<Document>>,
    postings: BTreeMap<String, Postings>,
    live: usize,
    dirty: bool,
}

impl SnapshotIndex {
    /// Creates an empty index that will persist into `index_dir`.
    pub fn create(index_dir: &Path, schema: Schema) -> Self {
        Self {
            index_dir: index_dir.to_path_buf(),
            schema,
            documents: Vec::new(),
            postings: BTreeMap::new(),
            live: 0,
            dirty: true,
        }
    }

    /// Opens the snapshot in `index_dir`, or `None` if it is missing or
    /// unusable with `schema`.
    pub fn open(index_dir: &Path, schema: Schema) -> Option<Self> {
        let documents = persistence::load_snapshot(index_dir, &schema)?;
        let mut index = Self::create(index_dir, schema);
        for document in documents {
            index.insert(document);
        }
        index.dirty = false;
        Some(index)
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    fn insert(&mut self, mut document: Document) {
        let schema = &self.schema;
        document.retain(|field| schema.is_stored(field));

        let id = self.documents.len() as DocId;
        for (field, value) in document.fields() {
            let Some(policy) = self.schema.policy(field) else {
                continue;
            };
            if !policy.is_searchable() {
                continue;
            }
            let postings = self.postings.entry(field.to_string()).or_default();
            for term in terms(policy, value) {
                postings.entry(term).or_default().insert(id);
            }
        }
        self.documents.push(Some(document));
        self.live += 1;
    }

    fn remove(&mut self, id: DocId) -> bool {
        let Some(document) = self.documents.get_mut(id as usize).and_then(Option::take) else {
            return false;
        };
        for (field, value) in document.fields() {
            let Some(policy) = self.schema.policy(field) else {
                continue;
            };
            let Some(postings) = self.postings.get_mut(field) else {
                continue;
            };
            for term in terms(policy, value) {
                if let Some(ids) = postings.get_mut(&term) {
                    ids.remove(&id);
                    if ids.is_empty() {
                        postings.remove(&term);
                    }
                }
            }
        }
        self.live -= 1;
        true
    }

    fn evaluate(&self, query: &EngineQuery) -> BTreeSet<DocId> {
        match query {
            EngineQuery::Term { field, value } => self.term_matches(field, value),
            EngineQuery::Prefix { field, prefix } => self.prefix_matches(field, prefix),
            EngineQuery::Boolean(clauses) => self.boolean_matches(clauses),
        }
    }

    fn term_matches(&self, field: &str, value: &str) -> BTreeSet<DocId> {
        let (Some(policy), Some(postings)) = (self.schema.policy(field), self.postings.get(field))
        else {
            return BTreeSet::new();
        };
        let mut result: Option<BTreeSet<DocId>> = None;
        for term in terms(policy, value) {
            let ids = postings.get(&term).cloned().unwrap_or_default();
            result = Some(match result {
                None => ids,
                Some(acc) => acc.intersection(&ids).copied().collect(),
            });
        }
        result.unwrap_or_default()
    }

    fn prefix_matches(&self, field: &str, prefix: &str) -> BTreeSet<DocId> {
        let (Some(policy), Some(postings)) = (self.schema.policy(field), self.postings.get(field))
        else {
            return BTreeSet::new();
        };
        let prefix = if policy.is_tokenized() {
            prefix.to_lowercase()
        } else {
            prefix.to_string()
        };
        postings
            .range(prefix.clone()..)
            .take_while(|(term, _)| term.starts_with(&prefix))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    fn boolean_matches(&self, clauses: &[Clause]) -> BTreeSet<DocId> {
        let mut must: Option<BTreeSet<DocId>> = None;
        let mut should = BTreeSet::new();
        let mut has_should = false;
        let mut must_not = BTreeSet::new();

        for clause in clauses {
            let matches = self.evaluate(&clause.query);
            match clause.occur {
                Occurrence::Must => {
                    must = Some(match must {
                        None => matches,
                        Some(acc) => acc.intersection(&matches).copied().collect(),
                    });
                }
                Occurrence::Should => {
                    has_should = true;
                    should.extend(matches);
                }
                Occurrence::MustNot => must_not.extend(matches),
            }
        }

        let positive = match must {
            Some(required) => required,
            None if has_should => should,
            None => BTreeSet::new(),
        };
        positive.difference(&must_not).copied().collect()
    }
}

impl IndexEngine for SnapshotIndex {
    fn add_document(&mut self, document: Document) -> Result<()> {
        if self.documents.len() >= DocId::MAX as usize {
            return Err(IndexError::Engine("document table is full".to_string()));
        }
        self.insert(document);
        self.dirty = true;
        Ok(())
    }

    fn delete_documents(&mut self, field: &str, value: &str) -> Result<usize> {
        let ids = self.term_matches(field, value);
        let removed = ids.into_iter().filter(|id| self.remove(*id)).count();
        if removed > 0 {
            self.dirty = true;
        }
        Ok(removed)
    }

    fn search(&self, query: &EngineQuery) -> Result<Vec<Document>> {
        Ok(self
            .evaluate(query)
            .into_iter()
            .filter_map(|id| self.documents.get(id as usize).and_then(Option::clone))
            .collect())
    }

    fn documents(&self) -> Vec<Document> {
        self.documents.iter().flatten().cloned().collect()
    }

    fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        persistence::write_snapshot(&self.index_dir, &self.schema, self.documents())?;
        self.dirty = false;
        Ok(())
    }

    fn len(&self) -> usize {
        self.live
    }
}

/// Terms a value contributes to (or looks up in) a field's postings.
fn terms(policy: FieldPolicy, value: &str) -> Vec<String> {
    if policy.is_tokenized() {
        value
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
            .collect()
    } else {
        vec![value.to_string()]
    }
}
