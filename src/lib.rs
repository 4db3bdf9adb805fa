//! Changed-path bloom filter index
//!
//! Speeds up "did this commit change path X" queries by attaching a small
//! bloom filter of changed paths to every commit and packing all filters into
//! one random-access file.
//!
//! - `artifacts`: filters, commit ids, the index formats and the manifest reader
//! - `areas`: the on-disk index file and its atomic publication
//! - `commands`: CLI operations on an index file

pub mod areas;
pub mod artifacts;
pub mod commands;

pub use artifacts::bloom::BloomSettings;
pub use artifacts::bloom::filter::Filter;
pub use artifacts::core::{Error, FormatError, Result};
pub use artifacts::graph_index::{
    BloomIndex, EncodeSummary, Encoder, FileIndex, MemoryIndex, OpenOptions,
};
pub use artifacts::objects::commit_id::CommitId;
