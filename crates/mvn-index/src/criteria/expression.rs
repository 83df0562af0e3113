//! Criterion expressions and their display form.

use std::fmt;

use crate::engine::Occurrence;
use crate::error::{IndexError, Result};

/// How a leaf value is compared with indexed terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MatchMode {
    #[default]
    Exact,
    /// Matches any term starting with the value; a trailing `*` is ignored.
    Prefix,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CriteriaOptions {
    pub occurrence: Occurrence,
    pub match_mode: MatchMode,
}

impl CriteriaOptions {
    /// Display operator, e.g. `MUST MATCH` or `SHOULD START WITH`.
    pub fn label(self) -> &'static str {
        match (self.occurrence, self.match_mode) {
            (Occurrence::Must, MatchMode::Exact) => "MUST MATCH",
            (Occurrence::Should, MatchMode::Exact) => "SHOULD MATCH",
            (Occurrence::MustNot, MatchMode::Exact) => "MUST NOT MATCH",
            (Occurrence::Must, MatchMode::Prefix) => "MUST START WITH",
            (Occurrence::Should, MatchMode::Prefix) => "SHOULD START WITH",
            (Occurrence::MustNot, MatchMode::Prefix) => "MUST NOT START WITH",
        }
    }
}

/// A search predicate: a single field match or a group of criteria.
///
/// Occurrence belongs to the edge from a group to its child, so every
/// criterion carries the occurrence it contributes to its enclosing group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    Leaf {
        field: String,
        value: String,
        options: CriteriaOptions,
    },
    Composite {
        children: Vec<Criterion>,
        occurrence: Occurrence,
    },
}

impl Criterion {
    /// Exact `MUST` match of `field` against `value`.
    pub fn leaf(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Leaf {
            field: field.into(),
            value: value.into(),
            options: CriteriaOptions::default(),
        }
    }

    /// Groups `children`; each child keeps its own occurrence.
    pub fn all(children: Vec<Criterion>) -> Result<Self> {
        if children.is_empty() {
            return Err(IndexError::InvalidInput(
                "cannot supply a null or empty criteria list".to_string(),
            ));
        }
        Ok(Self::Composite {
            children,
            occurrence: Occurrence::Must,
        })
    }

    pub fn occurrence(&self) -> Occurrence {
        match self {
            Self::Leaf { options, .. } => options.occurrence,
            Self::Composite { occurrence, .. } => *occurrence,
        }
    }

    pub fn with_occurrence(mut self, value: Occurrence) -> Self {
        match &mut self {
            Self::Leaf { options, .. } => options.occurrence = value,
            Self::Composite { occurrence, .. } => *occurrence = value,
        }
        self
    }

    pub fn should(self) -> Self {
        self.with_occurrence(Occurrence::Should)
    }

    pub fn must_not(self) -> Self {
        self.with_occurrence(Occurrence::MustNot)
    }

    /// Switches every leaf in this criterion to prefix matching.
    pub fn prefix(mut self) -> Self {
        self.set_match_mode(MatchMode::Prefix);
        self
    }

    /// Replaces the options of a leaf; on a group only the occurrence applies.
    pub fn with(mut self, value: CriteriaOptions) -> Self {
        match &mut self {
            Self::Leaf { options, .. } => *options = value,
            Self::Composite { occurrence, .. } => *occurrence = value.occurrence,
        }
        self
    }

    fn set_match_mode(&mut self, mode: MatchMode) {
        match self {
            Self::Leaf { options, .. } => options.match_mode = mode,
            Self::Composite { children, .. } => {
                for child in children {
                    child.set_match_mode(mode);
                }
            }
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf {
                field,
                value,
                options,
            } => write!(f, "({field} {} {value})", options.label()),
            Self::Composite { children, .. } => {
                f.write_str("[")?;
                for (index, child) in children.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str("]")
            }
        }
    }
}
