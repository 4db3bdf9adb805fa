//! Command implementations
//!
//! Commands are organized the way git splits its own:
//!
//! - `plumbing`: read-only inspection of an existing index (inspect, verify, ids, lookup)
//! - `porcelain`: building a new index from a changed-path manifest
//!
//! Each command is an `impl IndexStore` block writing its report to the
//! store's writer.

pub mod plumbing;
pub mod porcelain;
