//! Fixed-size records of the index file: file header, chunk table entries and
//! the bloom data parameter header.

use crate::artifacts::core::{FormatError, Result};
use crate::artifacts::graph_index::{
    BLOOM_DATA_HEADER_SIZE, BLOOM_DATA_VERSION, CHUNK_COUNT, CHUNK_ENTRY_SIZE, HEADER_SIZE,
    ID_FORMAT_SHA1, SIGNATURE, VERSION,
};
use crate::artifacts::objects::object::{Packable, Unpackable};
use byteorder::{ByteOrder, NetworkEndian, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct FileHeader {
    pub(crate) magic: [u8; 4],
    pub(crate) version: u8,
    pub(crate) id_format: u8,
    pub(crate) chunk_count: u8,
    #[new(default)]
    pub(crate) reserved: u8,
}

impl FileHeader {
    pub(crate) fn current() -> Self {
        FileHeader::new(*SIGNATURE, VERSION, ID_FORMAT_SHA1, CHUNK_COUNT)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn chunk_count(&self) -> u8 {
        self.chunk_count
    }

    /// Reject anything this reader cannot interpret
    pub(crate) fn validate(&self) -> Result<()> {
        if &self.magic != SIGNATURE {
            return Err(FormatError::BadMagic(self.magic).into());
        }
        if self.version != VERSION {
            return Err(FormatError::UnsupportedVersion(self.version).into());
        }
        if self.id_format != ID_FORMAT_SHA1 {
            return Err(FormatError::UnsupportedIdFormat(self.id_format).into());
        }
        if self.reserved != 0 {
            return Err(FormatError::ReservedByte(self.reserved).into());
        }

        Ok(())
    }
}

impl Packable for FileHeader {
    fn serialize(&self) -> Result<Bytes> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        bytes.write_all(&self.magic)?;
        bytes.write_u8(self.version)?;
        bytes.write_u8(self.id_format)?;
        bytes.write_u8(self.chunk_count)?;
        bytes.write_u8(self.reserved)?;

        Ok(Bytes::from(bytes))
    }
}

impl Unpackable for FileHeader {
    fn deserialize(bytes: Bytes) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::Truncated("file header").into());
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);

        Ok(FileHeader {
            magic,
            version: bytes[4],
            id_format: bytes[5],
            chunk_count: bytes[6],
            reserved: bytes[7],
        })
    }
}

/// One record of the chunk table
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct ChunkEntry {
    pub signature: [u8; 4],
    pub offset: u64,
}

impl ChunkEntry {
    pub(crate) fn terminator(offset: u64) -> Self {
        ChunkEntry::new([0; 4], offset)
    }

    pub fn is_terminator(&self) -> bool {
        self.signature == [0; 4]
    }

    pub fn signature_str(&self) -> String {
        String::from_utf8_lossy(&self.signature).into_owned()
    }
}

impl Packable for ChunkEntry {
    fn serialize(&self) -> Result<Bytes> {
        let mut bytes = Vec::with_capacity(CHUNK_ENTRY_SIZE);
        bytes.write_all(&self.signature)?;
        bytes.write_u64::<NetworkEndian>(self.offset)?;

        Ok(Bytes::from(bytes))
    }
}

impl Unpackable for ChunkEntry {
    fn deserialize(bytes: Bytes) -> Result<Self> {
        if bytes.len() < CHUNK_ENTRY_SIZE {
            return Err(FormatError::Truncated("chunk table").into());
        }

        let mut signature = [0u8; 4];
        signature.copy_from_slice(&bytes[0..4]);
        let offset = NetworkEndian::read_u64(&bytes[4..12]);

        Ok(ChunkEntry { signature, offset })
    }
}

/// Parameters the filters of an index were built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct BloomDataHeader {
    pub version: u32,
    pub num_hashes: u32,
    pub bits_per_entry: u32,
}

impl BloomDataHeader {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.version != BLOOM_DATA_VERSION {
            return Err(FormatError::UnsupportedBloomVersion(self.version).into());
        }
        if self.num_hashes == 0 {
            return Err(FormatError::InvalidBloomParameters.into());
        }

        Ok(())
    }
}

impl Packable for BloomDataHeader {
    fn serialize(&self) -> Result<Bytes> {
        let mut bytes = Vec::with_capacity(BLOOM_DATA_HEADER_SIZE);
        bytes.write_u32::<NetworkEndian>(self.version)?;
        bytes.write_u32::<NetworkEndian>(self.num_hashes)?;
        bytes.write_u32::<NetworkEndian>(self.bits_per_entry)?;

        Ok(Bytes::from(bytes))
    }
}

impl Unpackable for BloomDataHeader {
    fn deserialize(bytes: Bytes) -> Result<Self> {
        if bytes.len() < BLOOM_DATA_HEADER_SIZE {
            return Err(FormatError::Truncated("bloom data header").into());
        }

        Ok(BloomDataHeader {
            version: NetworkEndian::read_u32(&bytes[0..4]),
            num_hashes: NetworkEndian::read_u32(&bytes[4..8]),
            bits_per_entry: NetworkEndian::read_u32(&bytes[8..12]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::core::Error;
    use crate::artifacts::graph_index::CHUNK_FANOUT;

    #[test]
    fn test_file_header_layout() {
        let bytes = FileHeader::current().serialize().unwrap();
        pretty_assertions::assert_eq!(bytes.as_ref(), b"PBIX\x01\x01\x04\x00");
    }

    #[test]
    fn test_chunk_entry_layout() {
        let entry = ChunkEntry::new(CHUNK_FANOUT, 0x0102_0304_0506_0708);
        let bytes = entry.serialize().unwrap();

        pretty_assertions::assert_eq!(
            bytes.as_ref(),
            b"OIDF\x01\x02\x03\x04\x05\x06\x07\x08"
        );
        assert_eq!(ChunkEntry::deserialize(bytes).unwrap(), entry);
    }

    #[test]
    fn test_header_with_foreign_magic_is_rejected() {
        let header = FileHeader::deserialize(Bytes::from_static(b"CGPH\x01\x01\x04\x00")).unwrap();
        assert!(matches!(
            header.validate(),
            Err(Error::Format(FormatError::BadMagic(magic))) if &magic == b"CGPH"
        ));
    }

    #[test]
    fn test_header_with_future_version_is_rejected() {
        let header = FileHeader::deserialize(Bytes::from_static(b"PBIX\x02\x01\x04\x00")).unwrap();
        assert!(matches!(
            header.validate(),
            Err(Error::Format(FormatError::UnsupportedVersion(2)))
        ));
    }

    #[test]
    fn test_header_with_reserved_byte_set_is_rejected() {
        let header = FileHeader::deserialize(Bytes::from_static(b"PBIX\x01\x01\x04\x01")).unwrap();
        assert!(matches!(
            header.validate(),
            Err(Error::Format(FormatError::ReservedByte(1)))
        ));
        assert!(FileHeader::current().validate().is_ok());
    }

    #[test]
    fn test_short_header_is_truncated() {
        assert!(matches!(
            FileHeader::deserialize(Bytes::from_static(b"PBIX")),
            Err(Error::Format(FormatError::Truncated(_)))
        ));
    }

    #[test]
    fn test_bloom_header_requires_hashes() {
        let header = BloomDataHeader::new(BLOOM_DATA_VERSION, 0, 10);
        assert!(header.validate().is_err());
        assert!(BloomDataHeader::new(BLOOM_DATA_VERSION, 7, 10).validate().is_ok());
    }
}
