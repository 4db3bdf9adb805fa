//! Object identifiers and encoding traits
//!
//! The filter index never reads commit objects themselves. It only needs their
//! identifiers and a common way to pack fixed-size records.

pub mod commit_id;
pub mod object;

/// Length of a raw SHA-1 commit id in bytes
pub const COMMIT_ID_SIZE: usize = 20;

/// Length of a SHA-1 commit id in hexadecimal format
pub const COMMIT_ID_HEX_LENGTH: usize = 40;
