//! Compilation of criteria to engine queries.

use super::expression::{Criterion, MatchMode};
use crate::engine::{Clause, EngineQuery};

/// Compiles a criterion.
///
/// A group with a single child compiles to that child's query as is; larger
/// groups become a boolean query with one clause per child, each under the
/// child's own occurrence.
pub fn compile(criterion: &Criterion) -> EngineQuery {
    match criterion {
        Criterion::Leaf {
            field,
            value,
            options,
        } => match options.match_mode {
            MatchMode::Exact => EngineQuery::term(field.as_str(), value.as_str()),
            MatchMode::Prefix => EngineQuery::prefix(field.as_str(), value.trim_end_matches('*')),
        },
        Criterion::Composite { children, .. } => match children.as_slice() {
            [only] => compile(only),
            _ => EngineQuery::Boolean(
                children
                    .iter()
                    .map(|child| Clause {
                        occur: child.occurrence(),
                        query: compile(child),
                    })
                    .collect(),
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Occurrence;

    #[test]
    fn single_child_group_compiles_like_the_bare_leaf() {
        for leaf in [
            Criterion::leaf("groupId", "ddf"),
            Criterion::leaf("groupId", "dd*").prefix(),
            Criterion::leaf("groupId", "ddf").should(),
        ] {
            let group = Criterion::all(vec![leaf.clone()]).unwrap();
            assert_eq!(compile(&group), compile(&leaf));
            assert!(!matches!(compile(&group), EngineQuery::Boolean(_)));
        }
    }

    #[test]
    fn prefix_strips_trailing_wildcards() {
        let query = compile(&Criterion::leaf("packages", "com.example**").prefix());
        assert_eq!(query, EngineQuery::prefix("packages", "com.example"));
    }

    #[test]
    fn each_child_keeps_its_own_occurrence() {
        let packagings = Criterion::all(vec![
            Criterion::leaf("packaging", "pom").should(),
            Criterion::leaf("packaging", "bundle").should(),
        ])
        .unwrap();
        let criterion = Criterion::all(vec![
            Criterion::leaf("parent", "mvn:g/a/1"),
            packagings,
            Criterion::leaf("classifier", "sources").must_not(),
        ])
        .unwrap();

        let expected = EngineQuery::Boolean(vec![
            Clause {
                occur: Occurrence::Must,
                query: EngineQuery::term("parent", "mvn:g/a/1"),
            },
            Clause {
                occur: Occurrence::Must,
                query: EngineQuery::Boolean(vec![
                    Clause {
                        occur: Occurrence::Should,
                        query: EngineQuery::term("packaging", "pom"),
                    },
                    Clause {
                        occur: Occurrence::Should,
                        query: EngineQuery::term("packaging", "bundle"),
                    },
                ]),
            },
            Clause {
                occur: Occurrence::MustNot,
                query: EngineQuery::term("classifier", "sources"),
            },
        ]);
        assert_eq!(compile(&criterion), expected);
    }
}
