//! Field policies known to the engine.

use std::collections::BTreeMap;

use crate::error::{IndexError, Result};
use crate::ontology::{Field, FieldPolicy};

/// Policy per field name. Unknown fields are neither stored nor searchable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: BTreeMap<String, FieldPolicy>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a field. Registering the same name twice is allowed only
    /// with an identical policy.
    pub fn register(&mut self, field: &Field) -> Result<()> {
        match self.fields.get(field.name) {
            Some(existing) if *existing != field.policy => Err(IndexError::InvalidInput(format!(
                "field {} registered with conflicting policies",
                field.name
            ))),
            Some(_) => Ok(()),
            None => {
                self.fields.insert(field.name.to_string(), field.policy);
                Ok(())
            }
        }
    }

    pub fn policy(&self, name: &str) -> Option<FieldPolicy> {
        self.fields.get(name).copied()
    }

    pub fn is_stored(&self, name: &str) -> bool {
        self.policy(name)
            .is_some_and(|policy| policy.contains(FieldPolicy::STORED))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Compact form stored alongside persisted documents.
    pub(crate) fn to_persisted(&self) -> Vec<(String, u8)> {
        self.fields
            .iter()
            .map(|(name, policy)| (name.clone(), policy.bits()))
            .collect()
    }
}
