use crate::artifacts::core::Result;
use bytes::Bytes;

/// Types with a fixed binary encoding inside the index file
pub trait Packable {
    fn serialize(&self) -> Result<Bytes>;
}

pub trait Unpackable {
    fn deserialize(bytes: Bytes) -> Result<Self>
    where
        Self: Sized;
}
