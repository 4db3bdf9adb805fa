//! Disk-facing components
//!
//! - `lockfile`: atomic publication of a freshly written index
//! - `store`: the index file a command operates on

pub(crate) mod lockfile;
pub mod store;
