//! Index lifecycle.
//!
//! [`IndexContext::open_or_build`] reuses the snapshot under
//! `<repo>/<index_dir_name>` when one is present and readable, and otherwise
//! rebuilds it with a full repository scan:
//!
//! - `build` - Full builds, reuse detection and incremental refresh
//! - `context` - The open index handle and its query API
//! - `registry` - Process-wide claims on open repository locations

mod build;
mod context;
mod registry;

pub use context::IndexContext;
