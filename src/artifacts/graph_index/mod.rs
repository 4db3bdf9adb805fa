//! Changed-path filter index
//!
//! Maps commit ids to their [`Filter`]. Two implementations share the
//! [`BloomIndex`] capability set: [`MemoryIndex`] is filled while walking
//! history, [`FileIndex`] answers lookups from an encoded blob without loading
//! it whole. [`Encoder`] turns either one into that blob.
//!
//! ## File Format (Version 1)
//!
//! All integers are big-endian.
//!
//! ```text
//! Header (8 bytes):
//!   - Signature: "PBIX" (4 bytes)
//!   - Version: 1, id format: 1 (20-byte ids), chunk count: 4, reserved: 0
//!
//! Chunk table ((chunk count + 1) * 12 bytes):
//!   - 4-byte signature, 8-byte absolute offset
//!   - terminated by a zero signature whose offset is the payload length
//!
//! OIDF  fanout:        256 * u32 cumulative counts by leading id byte
//! OIDL  sorted ids:    N * 20 bytes, strictly ascending
//! BIDX  bloom offsets: N * u32 cumulative filter length in 64-bit words
//! BDAT  bloom data:    version, k, bits-per-entry (3 * u32) + filter bytes
//!
//! Checksum (20 bytes):
//!   - SHA-1 hash of all preceding bytes
//! ```

pub mod checksum;
pub mod encoder;
pub mod file_index;
pub mod header;
pub mod memory_index;
pub mod source;

pub use encoder::{EncodeSummary, Encoder};
pub use file_index::{FileIndex, OpenOptions};
pub use memory_index::MemoryIndex;

use crate::artifacts::bloom::filter::Filter;
use crate::artifacts::core::Result;
use crate::artifacts::objects::commit_id::CommitId;
use std::borrow::Cow;

/// Magic signature identifying filter index files
pub const SIGNATURE: &[u8; 4] = b"PBIX";

/// Index file format version
pub const VERSION: u8 = 1;

/// Id format: 20-byte SHA-1 commit ids
pub const ID_FORMAT_SHA1: u8 = 1;

/// Size of the file header in bytes
pub const HEADER_SIZE: usize = 8;

/// Size of one chunk table record (signature + offset)
pub const CHUNK_ENTRY_SIZE: usize = 12;

/// Number of chunks written by the encoder
pub const CHUNK_COUNT: u8 = 4;

/// Size of the SHA-1 checksum trailing the file
pub const CHECKSUM_SIZE: usize = 20;

pub const FANOUT_ENTRIES: usize = 256;
pub const FANOUT_SIZE: usize = FANOUT_ENTRIES * 4;

/// Largest count a fanout entry may hold
pub const MAX_FANOUT_VALUE: u32 = 0x7fff_ffff;

/// Version of the bloom data parameter header
pub const BLOOM_DATA_VERSION: u32 = 1;

/// Size of the bloom data parameter header in bytes
pub const BLOOM_DATA_HEADER_SIZE: usize = 12;

pub const CHUNK_FANOUT: [u8; 4] = *b"OIDF";
pub const CHUNK_SORTED_IDS: [u8; 4] = *b"OIDL";
pub const CHUNK_BLOOM_OFFSETS: [u8; 4] = *b"BIDX";
pub const CHUNK_BLOOM_DATA: [u8; 4] = *b"BDAT";

/// Human-readable chunk names keyed by signature
pub const CHUNK_NAMES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "OIDF" => "fanout",
    "OIDL" => "sorted ids",
    "BIDX" => "bloom offsets",
    "BDAT" => "bloom data",
};

/// Lookup capability shared by the in-memory and file-backed indexes
pub trait BloomIndex {
    /// Filter recorded for `id`
    ///
    /// `Ok(None)` when the id is unknown or was recorded without a filter.
    fn lookup(&self, id: &CommitId) -> Result<Option<Cow<'_, Filter>>>;

    /// Every known id, including ids recorded without a filter
    fn all_ids(&self) -> Result<Vec<CommitId>>;
}

impl<T: BloomIndex + ?Sized> BloomIndex for &T {
    fn lookup(&self, id: &CommitId) -> Result<Option<Cow<'_, Filter>>> {
        (**self).lookup(id)
    }

    fn all_ids(&self) -> Result<Vec<CommitId>> {
        (**self).all_ids()
    }
}
