#![allow(dead_code)]

use fake::Fake;
use fake::faker::lorem::en::Word;
use pathbloom::{CommitId, Filter};

/// Commit id with chosen leading and trailing bytes, zero elsewhere
pub fn commit_id(first: u8, last: u8) -> CommitId {
    let mut raw = [0u8; 20];
    raw[0] = first;
    raw[19] = last;
    CommitId::from_bytes(raw)
}

pub fn filter_with(expected_count: usize, paths: &[&str]) -> Filter {
    let mut filter = Filter::new(expected_count).expect("filter must not be empty");
    for path in paths {
        filter.add(path);
    }
    filter
}

/// Random relative path made of lorem words, e.g. `dolor/sit/amet.txt`
pub fn random_path() -> String {
    let depth = (1..4).fake::<usize>();
    let mut parts: Vec<String> = (0..depth).map(|_| Word().fake::<String>()).collect();
    parts.push(format!("{}.txt", Word().fake::<String>()));
    parts.join("/")
}

/// Manifest in `git log --format='commit %H' --name-only` layout
pub fn manifest(commits: &[(CommitId, Vec<String>)]) -> String {
    let mut out = String::new();
    for (id, paths) in commits {
        out.push_str(&format!("commit {id}\n\n"));
        for path in paths {
            out.push_str(path);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

// Helper function to create hexdump representation
pub fn to_hexdump(data: &[u8]) -> String {
    let mut result = String::new();
    for (i, chunk) in data.chunks(16).enumerate() {
        result.push_str(&format!("{:08x}: ", i * 16));

        for (j, byte) in chunk.iter().enumerate() {
            if j == 8 {
                result.push(' ');
            }
            result.push_str(&format!("{:02x} ", byte));
        }

        for j in chunk.len()..16 {
            if j == 8 {
                result.push(' ');
            }
            result.push_str("   ");
        }

        result.push_str(" |");
        for byte in chunk {
            if byte.is_ascii_graphic() {
                result.push(*byte as char);
            } else {
                result.push('.');
            }
        }
        result.push_str("|\n");
    }
    result
}

// Compare two encoded indexes with hexdump output on failure
#[macro_export]
macro_rules! assert_blob_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            pretty_assertions::assert_eq!(
                common::to_hexdump($left),
                common::to_hexdump($right),
                "\n=== INDEX CONTENTS DIFFER ===\n({} bytes vs {} bytes)",
                $left.len(),
                $right.len()
            );
        }
    };
}
