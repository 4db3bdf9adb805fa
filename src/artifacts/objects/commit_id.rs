//! Commit identifier
//!
//! A commit id is the raw 20-byte SHA-1 of a commit object. The filter index
//! only stores and compares ids; it never derives them.
//!
//! ## Format
//!
//! - Binary: 20 bytes, ordered byte-wise
//! - Text: 40 lowercase hex characters

use crate::artifacts::core::{Error, Result};
use crate::artifacts::objects::{COMMIT_ID_HEX_LENGTH, COMMIT_ID_SIZE};
use std::fmt;
use std::io;
use std::str::FromStr;

/// Raw 20-byte commit identifier
///
/// Ordering is the byte-wise ordering of the raw value, which is the order the
/// sorted-id chunk of an index file is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct CommitId([u8; COMMIT_ID_SIZE]);

impl CommitId {
    pub const fn from_bytes(bytes: [u8; COMMIT_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build an id from a slice that must hold exactly 20 bytes
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; COMMIT_ID_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::InvalidCommitId(format!("expected 20 bytes, got {}", bytes.len())))?;
        Ok(Self(raw))
    }

    /// Parse and validate an id from its 40-character hex form
    pub fn try_parse(id: &str) -> Result<Self> {
        if id.len() != COMMIT_ID_HEX_LENGTH {
            return Err(Error::InvalidCommitId(format!(
                "invalid length {}: {id}",
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidCommitId(format!("invalid characters: {id}")));
        }

        let mut raw = [0u8; COMMIT_ID_SIZE];
        for (i, byte) in raw.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&id[2 * i..2 * i + 2], 16)
                .map_err(|_| Error::InvalidCommitId(id.to_string()))?;
        }

        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; COMMIT_ID_SIZE] {
        &self.0
    }

    /// Leading byte, used to pick the fanout bucket
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    pub fn write_to<W: io::Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.0)
    }

    /// Abbreviated form (first 7 hex characters)
    pub fn to_short_id(&self) -> String {
        self.to_string()[..7].to_string()
    }
}

impl AsRef<[u8]> for CommitId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for CommitId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_parse(s)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::any;
    use proptest::proptest;

    proptest! {
        #[test]
        fn test_hex_form_parses_back_to_same_id(raw in proptest::array::uniform20(any::<u8>())) {
            let id = CommitId::from_bytes(raw);
            let parsed = CommitId::try_parse(&id.to_string()).unwrap();
            assert_eq!(parsed, id);
        }

        #[test]
        fn test_ordering_matches_raw_bytes(
            a in proptest::array::uniform20(any::<u8>()),
            b in proptest::array::uniform20(any::<u8>())
        ) {
            assert_eq!(CommitId::from_bytes(a).cmp(&CommitId::from_bytes(b)), a.cmp(&b));
        }
    }

    #[test]
    fn test_rejects_short_hex() {
        assert!(CommitId::try_parse("abc123").is_err());
    }

    #[test]
    fn test_rejects_non_hex_characters() {
        let id = "z".repeat(COMMIT_ID_HEX_LENGTH);
        assert!(CommitId::try_parse(&id).is_err());
    }

    #[test]
    fn test_display_is_lowercase_hex() {
        let mut raw = [0u8; COMMIT_ID_SIZE];
        raw[0] = 0xab;
        raw[19] = 0x01;
        let id = CommitId::from_bytes(raw);
        pretty_assertions::assert_eq!(
            id.to_string(),
            "ab00000000000000000000000000000000000001"
        );
        pretty_assertions::assert_eq!(id.to_short_id(), "ab00000");
    }

    #[test]
    fn test_try_from_slice_requires_twenty_bytes() {
        assert!(CommitId::try_from_slice(&[0u8; 19]).is_err());
        assert!(CommitId::try_from_slice(&[0u8; 20]).is_ok());
    }
}
