//! Plumbing commands
//!
//! ## Commands
//!
//! - `inspect`: header, chunk table and filter statistics
//! - `verify`: checksum and full structural check
//! - `ids`: list indexed commits in ascending order
//! - `lookup`: ask a commit's filter about paths

pub mod ids;
pub mod inspect;
pub mod lookup;
pub mod verify;
