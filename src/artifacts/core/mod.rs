//! Core utilities and shared types
//!
//! This module contains the error type shared across the crate.

pub mod error;

pub use error::{Error, FormatError, Result};
