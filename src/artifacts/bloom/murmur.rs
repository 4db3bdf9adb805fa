//! Murmur3 x86 32-bit hash
//!
//! Filters written by one process are probed by another, so the hash must be
//! stable across platforms and releases. It is kept here rather than borrowed
//! from a hashing crate whose output may change between versions.

use byteorder::{ByteOrder, LittleEndian};

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

#[inline]
fn mix_block(k: u32) -> u32 {
    k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let mut hash = seed;

    let mut blocks = data.chunks_exact(4);
    for block in blocks.by_ref() {
        hash ^= mix_block(LittleEndian::read_u32(block));
        hash = hash.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, byte) in tail.iter().enumerate() {
            k |= (*byte as u32) << (8 * i);
        }
        hash ^= mix_block(k);
    }

    hash ^= data.len() as u32;

    // finalization
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85eb_ca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2_ae35);
    hash ^= hash >> 16;

    hash
}
