//! Commit history input
//!
//! Walking history and diffing trees happens outside this crate. What arrives
//! here is the result: one record per commit with the paths it changed.

pub mod manifest;

/// Header line of one commit in `git log --format='commit %H' --name-only` output
pub const COMMIT_LINE_REGEX: &str = r"^commit ([0-9a-fA-F]{40})\s*$";
