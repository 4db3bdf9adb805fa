//! One-pass index serializer
//!
//! Ids are written in ascending byte order; the fanout table and the binary
//! search in [`FileIndex`](super::FileIndex) rely on it. Every byte goes
//! through a SHA-1 digest that is appended as the trailing checksum.
//!
//! Write errors abort immediately and nothing is cleaned up. Callers writing
//! to a shared location should stage to a temporary file and rename it into
//! place (see `areas::lockfile`).

use crate::artifacts::bloom::{BloomSettings, WORD_SIZE};
use crate::artifacts::core::{Error, Result};
use crate::artifacts::graph_index::checksum::ChecksumWriter;
use crate::artifacts::graph_index::header::{BloomDataHeader, ChunkEntry, FileHeader};
use crate::artifacts::graph_index::{
    BLOOM_DATA_HEADER_SIZE, BLOOM_DATA_VERSION, BloomIndex, CHECKSUM_SIZE, CHUNK_BLOOM_DATA,
    CHUNK_BLOOM_OFFSETS, CHUNK_COUNT, CHUNK_ENTRY_SIZE, CHUNK_FANOUT, CHUNK_SORTED_IDS,
    FANOUT_ENTRIES, FANOUT_SIZE, HEADER_SIZE, MAX_FANOUT_VALUE,
};
use crate::artifacts::objects::COMMIT_ID_SIZE;
use crate::artifacts::objects::commit_id::CommitId;
use crate::artifacts::objects::object::Packable;
use byteorder::{NetworkEndian, WriteBytesExt};
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What an encoding pass produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSummary {
    pub commits: usize,
    pub filters: usize,
    pub bloom_words: u64,
    /// Total file size, checksum included
    pub bytes_written: u64,
    pub checksum: [u8; CHECKSUM_SIZE],
}

#[derive(Debug, Clone, Default)]
pub struct Encoder {
    settings: BloomSettings,
    cancel: Option<Arc<AtomicBool>>,
}

/// Absolute offsets of the four chunks and the end of the payload
struct Layout {
    fanout: u64,
    sorted_ids: u64,
    bloom_offsets: u64,
    bloom_data: u64,
    end: u64,
}

impl Layout {
    fn new(commits: usize, bloom_words: u64) -> Self {
        let table = (CHUNK_COUNT as usize + 1) * CHUNK_ENTRY_SIZE;
        let fanout = (HEADER_SIZE + table) as u64;
        let sorted_ids = fanout + FANOUT_SIZE as u64;
        let bloom_offsets = sorted_ids + (commits * COMMIT_ID_SIZE) as u64;
        let bloom_data = bloom_offsets + (commits * 4) as u64;
        let end = bloom_data + BLOOM_DATA_HEADER_SIZE as u64 + bloom_words * WORD_SIZE as u64;

        Layout {
            fanout,
            sorted_ids,
            bloom_offsets,
            bloom_data,
            end,
        }
    }

    fn chunk_table(&self) -> [ChunkEntry; CHUNK_COUNT as usize + 1] {
        [
            ChunkEntry::new(CHUNK_FANOUT, self.fanout),
            ChunkEntry::new(CHUNK_SORTED_IDS, self.sorted_ids),
            ChunkEntry::new(CHUNK_BLOOM_OFFSETS, self.bloom_offsets),
            ChunkEntry::new(CHUNK_BLOOM_DATA, self.bloom_data),
            ChunkEntry::terminator(self.end),
        ]
    }
}

impl Encoder {
    /// Fails when `settings` cannot produce a readable index
    pub fn new(settings: BloomSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Encoder {
            settings,
            cancel: None,
        })
    }

    /// Abort with [`Error::Cancelled`] once `flag` is set
    ///
    /// The flag is checked between chunks, never in the middle of one.
    pub fn with_cancel(self, flag: Arc<AtomicBool>) -> Self {
        Encoder {
            cancel: Some(flag),
            ..self
        }
    }

    pub fn settings(&self) -> &BloomSettings {
        &self.settings
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    /// Serialize `index` to a byte vector
    pub fn encode_to_vec<I: BloomIndex + ?Sized>(&self, index: &I) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.encode(index, &mut bytes)?;
        Ok(bytes)
    }

    pub fn encode<I, W>(&self, index: &I, writer: W) -> Result<EncodeSummary>
    where
        I: BloomIndex + ?Sized,
        W: Write,
    {
        let mut ids = index.all_ids()?;
        ids.sort_unstable();
        ids.dedup();

        if ids.len() > MAX_FANOUT_VALUE as usize {
            return Err(Error::TooLarge("commit count"));
        }

        let fanout = build_fanout(&ids);
        let (offsets, filters) = self.bloom_offsets(index, &ids)?;
        let bloom_words = offsets.last().copied().unwrap_or(0) as u64;
        let layout = Layout::new(ids.len(), bloom_words);

        tracing::debug!(
            commits = ids.len(),
            filters,
            bloom_words,
            size = layout.end,
            "encoding filter index"
        );

        let mut writer = ChecksumWriter::new(BufWriter::new(writer));

        writer.write(&FileHeader::current().serialize()?)?;
        for entry in layout.chunk_table() {
            writer.write(&entry.serialize()?)?;
        }
        self.check_cancelled()?;

        let mut chunk = Vec::with_capacity(FANOUT_SIZE);
        for count in fanout {
            chunk.write_u32::<NetworkEndian>(count)?;
        }
        writer.write(&chunk)?;
        self.check_cancelled()?;

        for id in &ids {
            writer.write(id.as_bytes())?;
        }
        self.check_cancelled()?;

        let mut chunk = Vec::with_capacity(offsets.len() * 4);
        for offset in &offsets {
            chunk.write_u32::<NetworkEndian>(*offset)?;
        }
        writer.write(&chunk)?;
        self.check_cancelled()?;

        let params = BloomDataHeader::new(
            BLOOM_DATA_VERSION,
            self.settings.num_hashes,
            self.settings.bits_per_entry,
        );
        writer.write(&params.serialize()?)?;
        for id in &ids {
            if let Some(filter) = index.lookup(id)? {
                writer.write(filter.as_bytes())?;
            }
        }
        debug_assert_eq!(writer.written(), layout.end);

        let (_, checksum) = writer.write_checksum()?;

        Ok(EncodeSummary {
            commits: ids.len(),
            filters,
            bloom_words,
            bytes_written: layout.end + CHECKSUM_SIZE as u64,
            checksum,
        })
    }

    /// Running word count per id, summed over the actual length of each filter
    fn bloom_offsets<I: BloomIndex + ?Sized>(
        &self,
        index: &I,
        ids: &[CommitId],
    ) -> Result<(Vec<u32>, usize)> {
        let mut offsets = Vec::with_capacity(ids.len());
        let mut total = 0u32;
        let mut filters = 0usize;

        for id in ids {
            if let Some(filter) = index.lookup(id)? {
                if filter.num_hashes() != self.settings.num_hashes {
                    return Err(Error::ParameterMismatch {
                        id: *id,
                        expected: self.settings.num_hashes,
                        found: filter.num_hashes(),
                    });
                }

                let words = u32::try_from(filter.len_words())
                    .map_err(|_| Error::TooLarge("filter size"))?;
                total = total
                    .checked_add(words)
                    .ok_or(Error::TooLarge("bloom data size"))?;
                filters += 1;
            }
            offsets.push(total);
        }

        Ok((offsets, filters))
    }
}

/// Cumulative id counts by leading byte
fn build_fanout(sorted_ids: &[CommitId]) -> [u32; FANOUT_ENTRIES] {
    let mut fanout = [0u32; FANOUT_ENTRIES];
    for id in sorted_ids {
        fanout[id.first_byte() as usize] += 1;
    }
    for i in 1..FANOUT_ENTRIES {
        fanout[i] += fanout[i - 1];
    }
    fanout
}
