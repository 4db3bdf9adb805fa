//! Read-time index over an encoded blob
//!
//! Opening reads the header, the chunk table, the fanout table and the bloom
//! parameter header, and validates the chunk geometry. The sorted ids, bloom
//! offsets and bloom data stay on the source and are read per query:
//!
//! 1. the leading byte of the id selects the fanout bucket `[low, high)`
//! 2. the bucket is binary searched in the sorted-id chunk
//! 3. two adjacent bloom offsets give the filter's position and length
//! 4. a zero length means the commit has no filter
//!
//! Lookups only take `&self`; concurrent readers are safe as long as the
//! source supports concurrent positioned reads.

use crate::artifacts::bloom::WORD_SIZE;
use crate::artifacts::bloom::filter::Filter;
use crate::artifacts::core::{Error, FormatError, Result};
use crate::artifacts::graph_index::checksum;
use crate::artifacts::graph_index::header::{BloomDataHeader, ChunkEntry, FileHeader};
use crate::artifacts::graph_index::source::ReadAt;
use crate::artifacts::graph_index::{
    BLOOM_DATA_HEADER_SIZE, BloomIndex, CHECKSUM_SIZE, CHUNK_BLOOM_DATA, CHUNK_BLOOM_OFFSETS,
    CHUNK_ENTRY_SIZE, CHUNK_FANOUT, CHUNK_SORTED_IDS, FANOUT_ENTRIES, FANOUT_SIZE, HEADER_SIZE,
    MAX_FANOUT_VALUE, SIGNATURE,
};
use crate::artifacts::objects::COMMIT_ID_SIZE;
use crate::artifacts::objects::commit_id::CommitId;
use crate::artifacts::objects::object::Unpackable;
use byteorder::{ByteOrder, NetworkEndian};
use bytes::Bytes;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fs::File;
use std::io;
use std::path::Path;

/// How an index blob is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    /// Hash the whole blob and compare it with the trailing checksum
    pub verify_checksum: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions {
            verify_checksum: true,
        }
    }
}

impl OpenOptions {
    /// Skip checksum verification; structure is still validated
    pub fn unchecked() -> Self {
        OpenOptions {
            verify_checksum: false,
        }
    }

    pub fn verify_checksum(self, verify_checksum: bool) -> Self {
        OpenOptions { verify_checksum }
    }

    pub fn open<S: ReadAt>(&self, source: S) -> Result<FileIndex<S>> {
        FileIndex::open_with(source, *self)
    }

    pub fn open_path(&self, path: &Path) -> Result<FileIndex<File>> {
        let file = File::open(path)?;
        self.open(file)
    }
}

/// Absolute offsets of the required chunks and the end of the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    pub fanout: u64,
    pub sorted_ids: u64,
    pub bloom_offsets: u64,
    pub bloom_data: u64,
    pub end: u64,
    /// Sizes of the fanout, sorted-id, bloom offset and bloom data chunks
    pub sizes: [u64; 4],
}

impl ChunkLayout {
    /// First byte past the bloom data chunk
    pub fn bloom_data_end(&self) -> u64 {
        self.bloom_data + self.sizes[3]
    }
}

/// Filter statistics gathered from the bloom offset chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterStats {
    pub commits: u32,
    pub filters: u32,
    pub bloom_words: u64,
}

#[derive(Debug)]
pub struct FileIndex<S> {
    source: S,
    header: FileHeader,
    chunk_table: Vec<ChunkEntry>,
    chunks: ChunkLayout,
    fanout: Box<[u32; FANOUT_ENTRIES]>,
    bloom: BloomDataHeader,
}

impl<S: ReadAt> FileIndex<S> {
    /// Open with checksum verification
    pub fn open(source: S) -> Result<Self> {
        Self::open_with(source, OpenOptions::default())
    }

    pub fn open_with(source: S, options: OpenOptions) -> Result<Self> {
        let size = source.size()?;
        let payload_end = size
            .checked_sub(CHECKSUM_SIZE as u64)
            .filter(|end| *end >= HEADER_SIZE as u64)
            .ok_or(FormatError::Truncated("file header"))?;

        let header = FileHeader::deserialize(read_bytes(&source, 0, HEADER_SIZE, "file header")?)?;
        if &header.magic != SIGNATURE {
            return Err(FormatError::BadMagic(header.magic).into());
        }

        if options.verify_checksum {
            checksum::verify(&source)?;
        } else {
            tracing::debug!("opening filter index without checksum verification");
        }

        header.validate()?;

        let (chunk_table, chunks) = parse_chunk_table(&source, payload_end)?;
        if chunk_table.len() != header.chunk_count() as usize {
            return Err(FormatError::ChunkCountMismatch {
                expected: header.chunk_count(),
                actual: chunk_table.len(),
            }
            .into());
        }
        let fanout = parse_fanout(&source, chunks.fanout)?;
        let commits = fanout[FANOUT_ENTRIES - 1] as u64;
        validate_chunk_sizes(&chunks, commits)?;

        let bloom = BloomDataHeader::deserialize(read_bytes(
            &source,
            chunks.bloom_data,
            BLOOM_DATA_HEADER_SIZE,
            "bloom data header",
        )?)?;
        bloom.validate()?;

        tracing::debug!(
            commits,
            chunks = chunk_table.len(),
            num_hashes = bloom.num_hashes,
            bits_per_entry = bloom.bits_per_entry,
            "opened filter index"
        );

        Ok(FileIndex {
            source,
            header,
            chunk_table,
            chunks,
            fanout,
            bloom,
        })
    }

    /// Number of commits in the index
    pub fn len(&self) -> u32 {
        self.fanout[FANOUT_ENTRIES - 1]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Chunk table as stored, terminator excluded
    pub fn chunk_table(&self) -> &[ChunkEntry] {
        &self.chunk_table
    }

    pub fn chunks(&self) -> &ChunkLayout {
        &self.chunks
    }

    pub fn fanout(&self) -> &[u32; FANOUT_ENTRIES] {
        &self.fanout
    }

    /// Bloom parameters stored in the blob, honored by every returned filter
    pub fn bloom_params(&self) -> &BloomDataHeader {
        &self.bloom
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Position of `id` in the sorted-id chunk
    pub fn position(&self, id: &CommitId) -> Result<Option<u32>> {
        let bucket = id.first_byte() as usize;
        let mut low = if bucket == 0 {
            0
        } else {
            self.fanout[bucket - 1]
        };
        let mut high = self.fanout[bucket];

        let mut candidate = [0u8; COMMIT_ID_SIZE];
        while low < high {
            let mid = low + (high - low) / 2;
            self.read_into(&mut candidate, self.id_offset(mid), "sorted ids")?;

            match candidate.as_slice().cmp(id.as_bytes()) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return Ok(Some(mid)),
            }
        }

        Ok(None)
    }

    /// Filter recorded for `id`, `None` when absent or recorded without one
    pub fn find(&self, id: &CommitId) -> Result<Option<Filter>> {
        let Some(position) = self.position(id)? else {
            return Ok(None);
        };

        let (start, len) = self.filter_words(position)?;
        if len == 0 {
            return Ok(None);
        }

        let offset = self.chunks.bloom_data
            + BLOOM_DATA_HEADER_SIZE as u64
            + start * WORD_SIZE as u64;
        let byte_len = len * WORD_SIZE as u64;
        if offset + byte_len > self.chunks.bloom_data_end() {
            return Err(FormatError::Truncated("bloom data").into());
        }

        let mut bytes = vec![0u8; byte_len as usize];
        self.read_into(&mut bytes, offset, "bloom data")?;

        Ok(Some(
            Filter::from_raw_bytes(bytes)?.into_num_hashes(self.bloom.num_hashes)?,
        ))
    }

    /// Whether `path` may have changed in `id`
    ///
    /// `None` when the index holds no filter for the commit and the real diff
    /// has to be computed.
    pub fn may_contain(&self, id: &CommitId, path: &str) -> Result<Option<bool>> {
        Ok(self.find(id)?.map(|filter| filter.test(path)))
    }

    /// Read the id at `position` in the sorted-id chunk
    pub fn id_at(&self, position: u32) -> Result<CommitId> {
        let mut raw = [0u8; COMMIT_ID_SIZE];
        self.read_into(&mut raw, self.id_offset(position), "sorted ids")?;
        Ok(CommitId::from_bytes(raw))
    }

    /// Lazy, ascending iteration over the ids, one read per id
    pub fn ids(&self) -> Ids<'_, S> {
        Ids {
            index: self,
            next: 0,
            end: self.len(),
        }
    }

    /// Scan the bloom offset chunk in one read
    pub fn filter_stats(&self) -> Result<FilterStats> {
        let commits = self.len();
        let bytes = read_bytes(
            &self.source,
            self.chunks.bloom_offsets,
            commits as usize * 4,
            "bloom offsets",
        )?;

        let mut stats = FilterStats {
            commits,
            ..FilterStats::default()
        };
        let mut previous = 0u32;
        for (position, entry) in bytes.chunks_exact(4).enumerate() {
            let offset = NetworkEndian::read_u32(entry);
            if offset < previous {
                return Err(FormatError::NonMonotonicOffsets(position as u32).into());
            }
            if offset > previous {
                stats.filters += 1;
            }
            previous = offset;
        }
        stats.bloom_words = previous as u64;

        Ok(stats)
    }

    fn id_offset(&self, position: u32) -> u64 {
        self.chunks.sorted_ids + position as u64 * COMMIT_ID_SIZE as u64
    }

    fn bloom_offset(&self, position: u32) -> Result<u32> {
        let mut raw = [0u8; 4];
        self.read_into(
            &mut raw,
            self.chunks.bloom_offsets + position as u64 * 4,
            "bloom offsets",
        )?;
        Ok(NetworkEndian::read_u32(&raw))
    }

    /// Start and length, in words, of the filter at `position`
    fn filter_words(&self, position: u32) -> Result<(u64, u64)> {
        let end = self.bloom_offset(position)?;
        let start = match position {
            0 => 0,
            _ => self.bloom_offset(position - 1)?,
        };

        if end < start {
            return Err(FormatError::NonMonotonicOffsets(position).into());
        }

        Ok((start as u64, (end - start) as u64))
    }

    fn read_into(&self, buf: &mut [u8], offset: u64, what: &'static str) -> Result<()> {
        read_exact(&self.source, buf, offset, what)
    }
}

impl<S: ReadAt> BloomIndex for FileIndex<S> {
    fn lookup(&self, id: &CommitId) -> Result<Option<Cow<'_, Filter>>> {
        Ok(self.find(id)?.map(Cow::Owned))
    }

    /// Materializes the whole sorted-id chunk; prefer [`FileIndex::ids`] for
    /// large indexes.
    fn all_ids(&self) -> Result<Vec<CommitId>> {
        let bytes = read_bytes(
            &self.source,
            self.chunks.sorted_ids,
            self.len() as usize * COMMIT_ID_SIZE,
            "sorted ids",
        )?;

        bytes
            .chunks_exact(COMMIT_ID_SIZE)
            .map(CommitId::try_from_slice)
            .collect()
    }
}

/// Iterator returned by [`FileIndex::ids`]
#[derive(Debug)]
pub struct Ids<'a, S> {
    index: &'a FileIndex<S>,
    next: u32,
    end: u32,
}

impl<S: ReadAt> Iterator for Ids<'_, S> {
    type Item = Result<CommitId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }

        let id = self.index.id_at(self.next);
        // stop after the first failure
        self.next = match id {
            Ok(_) => self.next + 1,
            Err(_) => self.end,
        };
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next) as usize;
        (remaining, Some(remaining))
    }
}

/// Short reads inside the blob mean it is truncated; other I/O errors pass through
fn read_exact<S: ReadAt + ?Sized>(
    source: &S,
    buf: &mut [u8],
    offset: u64,
    what: &'static str,
) -> Result<()> {
    source.read_exact_at(buf, offset).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::Format(FormatError::Truncated(what)),
        _ => Error::Io(e),
    })
}

fn read_bytes<S: ReadAt + ?Sized>(
    source: &S,
    offset: u64,
    len: usize,
    what: &'static str,
) -> Result<Bytes> {
    let mut buf = vec![0u8; len];
    read_exact(source, &mut buf, offset, what)?;
    Ok(Bytes::from(buf))
}

fn chunk_name(signature: &[u8; 4]) -> Option<&'static str> {
    match *signature {
        CHUNK_FANOUT => Some("fanout"),
        CHUNK_SORTED_IDS => Some("sorted ids"),
        CHUNK_BLOOM_OFFSETS => Some("bloom offsets"),
        CHUNK_BLOOM_DATA => Some("bloom data"),
        _ => None,
    }
}

/// Scan chunk records up to the zero-signature terminator
fn parse_chunk_table<S: ReadAt + ?Sized>(
    source: &S,
    payload_end: u64,
) -> Result<(Vec<ChunkEntry>, ChunkLayout)> {
    let mut entries = Vec::new();
    let mut slots: [Option<usize>; 4] = [None; 4];
    let mut position = HEADER_SIZE as u64;

    let end = loop {
        if position + CHUNK_ENTRY_SIZE as u64 > payload_end {
            return Err(FormatError::Truncated("chunk table").into());
        }

        let entry = ChunkEntry::deserialize(read_bytes(
            source,
            position,
            CHUNK_ENTRY_SIZE,
            "chunk table",
        )?)?;
        position += CHUNK_ENTRY_SIZE as u64;

        if entry.is_terminator() {
            break entry.offset;
        }

        let slot = match entry.signature {
            CHUNK_FANOUT => Some(0),
            CHUNK_SORTED_IDS => Some(1),
            CHUNK_BLOOM_OFFSETS => Some(2),
            CHUNK_BLOOM_DATA => Some(3),
            _ => None,
        };
        match slot {
            Some(slot) => {
                if slots[slot].is_some() {
                    let name = chunk_name(&entry.signature).unwrap_or("unknown");
                    return Err(FormatError::DuplicateChunk(name).into());
                }
                slots[slot] = Some(entries.len());
            }
            None => tracing::debug!(chunk = %entry.signature_str(), "skipping unknown chunk"),
        }
        entries.push(entry);
    };

    if end != payload_end {
        return Err(FormatError::ChunkSizeMismatch {
            chunk: "payload",
            expected: payload_end,
            actual: end,
        }
        .into());
    }

    let table_end = position;
    if let Some(entry) = entries
        .iter()
        .find(|entry| entry.offset < table_end || entry.offset > end)
    {
        let name = chunk_name(&entry.signature).unwrap_or("unknown");
        return Err(FormatError::ChunkOutOfBounds(name).into());
    }

    let sizes = chunk_sizes(&entries, end);
    let extent = |slot: usize, name: &'static str| -> Result<(u64, u64)> {
        slots[slot]
            .map(|index| (entries[index].offset, sizes[index]))
            .ok_or_else(|| FormatError::MissingChunk(name).into())
    };

    let (fanout, fanout_size) = extent(0, "fanout")?;
    let (sorted_ids, sorted_ids_size) = extent(1, "sorted ids")?;
    let (bloom_offsets, bloom_offsets_size) = extent(2, "bloom offsets")?;
    let (bloom_data, bloom_data_size) = extent(3, "bloom data")?;

    let chunks = ChunkLayout {
        fanout,
        sorted_ids,
        bloom_offsets,
        bloom_data,
        end,
        sizes: [fanout_size, sorted_ids_size, bloom_offsets_size, bloom_data_size],
    };

    Ok((entries, chunks))
}

/// Size of every chunk in table order
///
/// A chunk extends to the next chunk start in offset order, or to the payload
/// end. Chunks sharing an offset are ordered by their table position, so all
/// but the last of them are empty.
fn chunk_sizes(entries: &[ChunkEntry], end: u64) -> Vec<u64> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by_key(|&index| (entries[index].offset, index));

    let mut sizes = vec![0u64; entries.len()];
    for (rank, &index) in order.iter().enumerate() {
        let next = order
            .get(rank + 1)
            .map_or(end, |&following| entries[following].offset);
        sizes[index] = next - entries[index].offset;
    }

    sizes
}

fn parse_fanout<S: ReadAt + ?Sized>(source: &S, offset: u64) -> Result<Box<[u32; FANOUT_ENTRIES]>> {
    let bytes = read_bytes(source, offset, FANOUT_SIZE, "fanout")?;

    let mut fanout = Box::new([0u32; FANOUT_ENTRIES]);
    let mut previous = 0u32;
    for (index, entry) in bytes.chunks_exact(4).enumerate() {
        let count = NetworkEndian::read_u32(entry);
        if count > MAX_FANOUT_VALUE || count < previous {
            return Err(FormatError::InvalidFanout { index }.into());
        }
        fanout[index] = count;
        previous = count;
    }

    Ok(fanout)
}

fn validate_chunk_sizes(chunks: &ChunkLayout, commits: u64) -> Result<()> {
    let [fanout, sorted_ids, bloom_offsets, bloom_data] = chunks.sizes;

    let exact = [
        ("fanout", fanout, FANOUT_SIZE as u64),
        ("sorted ids", sorted_ids, commits * COMMIT_ID_SIZE as u64),
        ("bloom offsets", bloom_offsets, commits * 4),
    ];
    for (chunk, actual, expected) in exact {
        if actual != expected {
            return Err(FormatError::ChunkSizeMismatch {
                chunk,
                expected,
                actual,
            }
            .into());
        }
    }

    if bloom_data < BLOOM_DATA_HEADER_SIZE as u64 {
        return Err(FormatError::ChunkSizeMismatch {
            chunk: "bloom data",
            expected: BLOOM_DATA_HEADER_SIZE as u64,
            actual: bloom_data,
        }
        .into());
    }

    Ok(())
}
