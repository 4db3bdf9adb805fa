use crate::artifacts::core::{Error, FormatError, Result};
use crate::artifacts::graph_index::CHECKSUM_SIZE;
use crate::artifacts::graph_index::source::ReadAt;
use sha1::{Digest, Sha1};
use std::io::Write;

/// Block size used when hashing a source for verification
const VERIFY_BLOCK_SIZE: usize = 64 * 1024;

/// Writer that hashes everything passing through it
#[derive(Debug)]
pub struct ChecksumWriter<W: Write> {
    writer: W,
    digest: Sha1,
    written: u64,
}

impl<W: Write> ChecksumWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        ChecksumWriter {
            writer,
            digest: Sha1::new(),
            written: 0,
        }
    }

    pub(crate) fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.digest.update(data);
        self.written += data.len() as u64;
        Ok(())
    }

    pub(crate) fn written(&self) -> u64 {
        self.written
    }

    /// Append the digest of everything written so far and hand back the writer
    pub(crate) fn write_checksum(mut self) -> Result<(W, [u8; CHECKSUM_SIZE])> {
        let mut checksum = [0u8; CHECKSUM_SIZE];
        checksum.copy_from_slice(&self.digest.clone().finalize());
        self.writer.write_all(&checksum)?;
        self.writer.flush()?;

        Ok((self.writer, checksum))
    }
}

/// Hash every byte of `source` before the trailing checksum and compare
pub fn verify<S: ReadAt + ?Sized>(source: &S) -> Result<()> {
    let size = source.size()?;
    let payload_len = size
        .checked_sub(CHECKSUM_SIZE as u64)
        .ok_or(FormatError::Truncated("checksum"))?;

    let mut digest = Sha1::new();
    let mut buffer = vec![0u8; VERIFY_BLOCK_SIZE];
    let mut offset = 0u64;
    while offset < payload_len {
        let len = (payload_len - offset).min(VERIFY_BLOCK_SIZE as u64) as usize;
        source.read_exact_at(&mut buffer[..len], offset)?;
        digest.update(&buffer[..len]);
        offset += len as u64;
    }

    let mut expected = [0u8; CHECKSUM_SIZE];
    source.read_exact_at(&mut expected, payload_len)?;

    if expected[..] != digest.finalize()[..] {
        return Err(Error::ChecksumMismatch);
    }

    Ok(())
}
