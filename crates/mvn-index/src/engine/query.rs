//! Engine-level query representation.

use std::fmt;

/// How a clause participates in a boolean query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Occurrence {
    #[default]
    Must,
    Should,
    MustNot,
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Must => "MUST",
            Self::Should => "SHOULD",
            Self::MustNot => "MUST NOT",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub occur: Occurrence,
    pub query: EngineQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineQuery {
    /// Exact term. Tokenized fields compare lowercased tokens.
    Term { field: String, value: String },
    /// Any term starting with `prefix`.
    Prefix { field: String, prefix: String },
    Boolean(Vec<Clause>),
}

impl EngineQuery {
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::Prefix {
            field: field.into(),
            prefix: prefix.into(),
        }
    }
}

impl fmt::Display for EngineQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term { field, value } => write!(f, "{field}:{value}"),
            Self::Prefix { field, prefix } => write!(f, "{field}:{prefix}*"),
            Self::Boolean(clauses) => {
                f.write_str("(")?;
                for (index, clause) in clauses.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }
                    let marker = match clause.occur {
                        Occurrence::Must => "+",
                        Occurrence::Should => "",
                        Occurrence::MustNot => "-",
                    };
                    write!(f, "{marker}{}", clause.query)?;
                }
                f.write_str(")")
            }
        }
    }
}
