//! Search criteria: a small boolean algebra over field matches.
//!
//! ```
//! use mvn_index::criteria::Criterion;
//! use mvn_index::ontology;
//!
//! let criterion = Criterion::all(vec![
//!     Criterion::leaf(ontology::GROUP_ID.name, "org.example"),
//!     Criterion::leaf(ontology::PACKAGES.name, "org.example.api").prefix(),
//! ])
//! .unwrap();
//! assert_eq!(
//!     criterion.to_string(),
//!     "[(groupId MUST MATCH org.example), (packages MUST START WITH org.example.api)]"
//! );
//! ```

mod compile;
mod expression;

pub use crate::engine::Occurrence;
pub use compile::compile;
pub use expression::{CriteriaOptions, Criterion, MatchMode};
