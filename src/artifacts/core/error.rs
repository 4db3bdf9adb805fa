//! Error taxonomy for the filter index
//!
//! Three kinds of failure are kept apart:
//!
//! - **Format errors**: the blob is not a valid index (bad magic, missing chunk,
//!   truncated table, non-monotonic fanout). Always fatal.
//! - **I/O errors**: propagated verbatim from the underlying storage.
//! - **Not found**: not an error at all. Lookups return `Ok(None)` so a missing
//!   filter can never be mistaken for a storage failure.

use crate::artifacts::objects::commit_id::CommitId;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid filter index: {0}")]
    Format(#[from] FormatError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("checksum does not match value stored in the index")]
    ChecksumMismatch,
    #[error("a filter must hold at least one 64-bit word")]
    EmptyFilter,
    #[error("a filter needs at least one hash function")]
    NoHashFunctions,
    #[error("filter for {id} uses {found} hash functions, index is written with {expected}")]
    ParameterMismatch {
        id: CommitId,
        expected: u32,
        found: u32,
    },
    #[error("index exceeds format limits: {0}")]
    TooLarge(&'static str),
    #[error("encoding was cancelled")]
    Cancelled,
    #[error("invalid commit id: {0}")]
    InvalidCommitId(String),
    #[error("malformed changed-path manifest at line {line}: {reason}")]
    Manifest { line: usize, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("unexpected end of data while reading {0}")]
    Truncated(&'static str),
    #[error("bad magic {0:?}")]
    BadMagic([u8; 4]),
    #[error("unsupported version {0}")]
    UnsupportedVersion(u8),
    #[error("unsupported commit id format {0}")]
    UnsupportedIdFormat(u8),
    #[error("reserved header byte is {0}, expected 0")]
    ReservedByte(u8),
    #[error("header announces {expected} chunks, table holds {actual}")]
    ChunkCountMismatch { expected: u8, actual: usize },
    #[error("unsupported bloom data version {0}")]
    UnsupportedBloomVersion(u32),
    #[error("missing required chunk {0}")]
    MissingChunk(&'static str),
    #[error("duplicate chunk {0}")]
    DuplicateChunk(&'static str),
    #[error("chunk {0} lies outside the payload")]
    ChunkOutOfBounds(&'static str),
    #[error("chunk {chunk} has size {actual}, expected {expected}")]
    ChunkSizeMismatch {
        chunk: &'static str,
        expected: u64,
        actual: u64,
    },
    #[error("fanout entry {index} is invalid")]
    InvalidFanout { index: usize },
    #[error("bloom offsets decrease at position {0}")]
    NonMonotonicOffsets(u32),
    #[error("bloom parameters are invalid")]
    InvalidBloomParameters,
}
