//! Per-commit changed-path filter
//!
//! The bit buffer is allocated once, in whole 64-bit words, and bits are only
//! ever set. Undersizing raises the false-positive rate but never produces a
//! false negative.

use crate::artifacts::bloom::murmur::murmur3_32;
use crate::artifacts::bloom::{BloomSettings, DEFAULT_NUM_HASHES, SEED_0, SEED_1, WORD_SIZE};
use crate::artifacts::core::{Error, Result};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    bits: Vec<u8>,
    num_hashes: u32,
}

impl Filter {
    /// Allocate a filter of `expected_count` bits rounded up to a whole word
    ///
    /// An `expected_count` of zero would leave no bits to probe and is rejected.
    pub fn new(expected_count: usize) -> Result<Self> {
        Self::with_num_hashes(expected_count, DEFAULT_NUM_HASHES)
    }

    pub fn with_num_hashes(expected_count: usize, num_hashes: u32) -> Result<Self> {
        let words = expected_count.div_ceil(64);
        if words == 0 {
            return Err(Error::EmptyFilter);
        }
        if num_hashes == 0 {
            return Err(Error::NoHashFunctions);
        }

        Ok(Filter {
            bits: vec![0; words * WORD_SIZE],
            num_hashes,
        })
    }

    /// Wrap bytes produced by [`Filter::as_bytes`]
    ///
    /// The caller guarantees the bytes come from a filter of the same size; only
    /// an empty or partial-word buffer is refused, since probing it is undefined.
    pub fn from_raw_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() || bytes.len() % WORD_SIZE != 0 {
            return Err(Error::EmptyFilter);
        }

        Ok(Filter {
            bits: bytes,
            num_hashes: DEFAULT_NUM_HASHES,
        })
    }

    /// Override the probe count, e.g. with the value stored in an index header
    pub fn into_num_hashes(self, num_hashes: u32) -> Result<Self> {
        if num_hashes == 0 {
            return Err(Error::NoHashFunctions);
        }
        Ok(Filter { num_hashes, ..self })
    }

    /// Build the filter for one commit from its changed paths
    ///
    /// Every leading directory of a changed path is added as well, so asking
    /// whether `src/` changed is answered by the same filter. Returns `None`
    /// when the commit touched more paths than `settings.max_changed_paths`;
    /// such commits are recorded without a filter. An empty change set still
    /// gets one zeroed word so every query on it is a definite "no".
    pub fn from_changed_paths<I, S>(paths: I, settings: &BloomSettings) -> Result<Option<Self>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys = BTreeSet::new();
        let mut changed = 0usize;

        for path in paths {
            let path = path.as_ref().trim_matches('/');
            if path.is_empty() {
                continue;
            }
            changed += 1;
            if changed > settings.max_changed_paths {
                return Ok(None);
            }

            keys.insert(path.to_string());
            let mut prefix = path;
            while let Some((parent, _)) = prefix.rsplit_once('/') {
                keys.insert(parent.to_string());
                prefix = parent;
            }
        }

        let bit_count = (keys.len() * settings.bits_per_entry as usize).max(1);
        let mut filter = Self::with_num_hashes(bit_count, settings.num_hashes)?;
        for key in &keys {
            filter.add(key);
        }

        Ok(Some(filter))
    }

    fn probes(&self, path: &str) -> impl Iterator<Item = usize> + use<> {
        let bit_len = (self.bits.len() * 8) as u64;
        let h0 = murmur3_32(path.as_bytes(), SEED_0) as u64;
        let h1 = murmur3_32(path.as_bytes(), SEED_1) as u64;

        (0..self.num_hashes as u64).map(move |i| ((h0 + i * h1) % bit_len) as usize)
    }

    pub fn add(&mut self, path: &str) {
        for bit in self.probes(path) {
            self.bits[bit / 8] |= 1 << (bit % 8);
        }
    }

    /// `false` means the path was definitely not added
    pub fn test(&self, path: &str) -> bool {
        self.probes(path)
            .all(|bit| self.bits[bit / 8] & (1 << (bit % 8)) != 0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bits
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Length of the bit buffer in 64-bit words
    pub fn len_words(&self) -> usize {
        self.bits.len() / WORD_SIZE
    }

    pub fn bit_len(&self) -> usize {
        self.bits.len() * 8
    }
}
