//! Changed-path bloom filters
//!
//! Every indexed commit carries a small probabilistic set of the paths it
//! changed. A negative answer is authoritative; a positive answer only means
//! the real diff has to be consulted.
//!
//! ## Probing
//!
//! ```text
//! h0 = murmur3_32(path, SEED_0)
//! h1 = murmur3_32(path, SEED_1)
//! bit(i) = (h0 + i * h1) mod bit_len      for i in 0..k
//! ```

pub mod filter;
pub mod murmur;

use crate::artifacts::core::{Error, Result};

/// Seeds of the two independent path hashes
pub const SEED_0: u32 = 0x293a_e76f;
pub const SEED_1: u32 = 0x7e64_6e2c;

/// Probe positions per add/test
pub const DEFAULT_NUM_HASHES: u32 = 7;

/// Bits reserved per changed path when sizing a filter
pub const DEFAULT_BITS_PER_ENTRY: u32 = 10;

/// Commits changing more paths than this get no filter
pub const DEFAULT_MAX_CHANGED_PATHS: usize = 512;

/// Filters are sized in whole 64-bit words
pub const WORD_SIZE: usize = 8;

/// Bloom parameters used when building filters and writing an index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloomSettings {
    pub num_hashes: u32,
    pub bits_per_entry: u32,
    pub max_changed_paths: usize,
}

impl BloomSettings {
    pub fn validate(&self) -> Result<()> {
        if self.num_hashes == 0 {
            return Err(Error::NoHashFunctions);
        }
        Ok(())
    }

    pub fn with_bits_per_entry(self, bits_per_entry: u32) -> Self {
        Self {
            bits_per_entry,
            ..self
        }
    }

    pub fn with_max_changed_paths(self, max_changed_paths: usize) -> Self {
        Self {
            max_changed_paths,
            ..self
        }
    }
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            num_hashes: DEFAULT_NUM_HASHES,
            bits_per_entry: DEFAULT_BITS_PER_ENTRY,
            max_changed_paths: DEFAULT_MAX_CHANGED_PATHS,
        }
    }
}
