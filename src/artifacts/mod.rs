//! Data structures and formats
//!
//! - `bloom`: the per-commit changed-path filter
//! - `core`: shared error type
//! - `graph_index`: in-memory and file-backed indexes and the encoder between them
//! - `log`: reader for changed-path manifests produced from commit history
//! - `objects`: commit ids and record encoding traits

pub mod bloom;
pub mod core;
pub mod graph_index;
pub mod log;
pub mod objects;
