//! Changed-path manifest reader
//!
//! Parses the output of
//!
//! ```text
//! git log --format='commit %H' --name-only
//! ```
//!
//! into one [`ChangedCommit`] per commit. Blank lines are ignored; every other
//! line after a commit header is a changed path of that commit.

use crate::artifacts::core::{Error, Result};
use crate::artifacts::log::COMMIT_LINE_REGEX;
use crate::artifacts::objects::commit_id::CommitId;
use derive_new::new;
use regex::Regex;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct ChangedCommit {
    pub id: CommitId,
    pub paths: Vec<String>,
}

/// Streaming reader yielding commits in manifest order
#[derive(Debug)]
pub struct ManifestReader<R> {
    reader: R,
    commit_line: Regex,
    line_number: usize,
    pending: Option<ChangedCommit>,
    done: bool,
}

impl<R: BufRead> ManifestReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        let commit_line = Regex::new(COMMIT_LINE_REGEX).map_err(|e| Error::Manifest {
            line: 0,
            reason: e.to_string(),
        })?;

        Ok(ManifestReader {
            reader,
            commit_line,
            line_number: 0,
            pending: None,
            done: false,
        })
    }

    fn read_commit(&mut self) -> Result<Option<ChangedCommit>> {
        let mut line = String::new();

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(self.pending.take());
            }
            self.line_number += 1;

            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.trim().is_empty() {
                continue;
            }

            if let Some(caps) = self.commit_line.captures(trimmed) {
                let id = CommitId::try_parse(&caps[1].to_ascii_lowercase())?;
                let next = ChangedCommit::new(id, Vec::new());
                if let Some(finished) = self.pending.replace(next) {
                    return Ok(Some(finished));
                }
                continue;
            }

            match self.pending.as_mut() {
                Some(commit) => commit.paths.push(trimmed.to_string()),
                None => {
                    return Err(Error::Manifest {
                        line: self.line_number,
                        reason: format!("path {trimmed:?} before the first commit line"),
                    });
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for ManifestReader<R> {
    type Item = Result<ChangedCommit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let commit = self.read_commit();
        if !matches!(commit, Ok(Some(_))) {
            self.done = true;
        }
        commit.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FIRST: &str = "1111111111111111111111111111111111111111";
    const SECOND: &str = "ABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD";

    fn read(input: &str) -> Result<Vec<ChangedCommit>> {
        ManifestReader::new(Cursor::new(input.to_string()))?.collect()
    }

    #[test]
    fn test_commits_with_paths() {
        let input = format!("commit {FIRST}\n\nsrc/lib.rs\nREADME.md\n\ncommit {SECOND}\n\ndocs/a b.md\n");
        let commits = read(&input).unwrap();

        pretty_assertions::assert_eq!(
            commits,
            vec![
                ChangedCommit::new(
                    CommitId::try_parse(FIRST).unwrap(),
                    vec!["src/lib.rs".to_string(), "README.md".to_string()]
                ),
                ChangedCommit::new(
                    CommitId::try_parse(&SECOND.to_lowercase()).unwrap(),
                    vec!["docs/a b.md".to_string()]
                ),
            ]
        );
    }

    #[test]
    fn test_commit_without_paths_is_kept() {
        let input = format!("commit {FIRST}\ncommit {SECOND}\r\nx\r\n");
        let commits = read(&input).unwrap();

        assert_eq!(commits.len(), 2);
        assert!(commits[0].paths.is_empty());
        pretty_assertions::assert_eq!(commits[1].paths, vec!["x".to_string()]);
    }

    #[test]
    fn test_path_before_commit_is_an_error() {
        let err = read("src/lib.rs\n").unwrap_err();
        assert!(matches!(err, Error::Manifest { line: 1, .. }));
    }

    #[test]
    fn test_empty_input_has_no_commits() {
        assert!(read("").unwrap().is_empty());
        assert!(read("\n\n").unwrap().is_empty());
    }
}
