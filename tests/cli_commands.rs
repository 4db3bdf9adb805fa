use assert_cmd::Command;
use assert_fs::fixture::{FileWriteStr, PathChild};
use pathbloom::artifacts::graph_index::CHECKSUM_SIZE;
use predicates::prelude::predicate;

mod common;
use common::{commit_id, manifest, random_path};

fn sample_manifest() -> String {
    manifest(&[
        (
            commit_id(0x10, 1),
            vec!["src/lib.rs".to_string(), "README.md".to_string()],
        ),
        (commit_id(0x20, 2), vec![]),
        (
            commit_id(0x30, 3),
            (0..5).map(|_| random_path()).collect(),
        ),
    ])
}

fn build_index(dir: &assert_fs::TempDir) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
    let input = dir.child("manifest.txt");
    input.write_str(&sample_manifest())?;
    let index = dir.child("filters.idx");

    Command::cargo_bin("pathbloom")?
        .arg("build")
        .arg(index.path())
        .arg("--input")
        .arg(input.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 commits (3 with filters"));

    Ok(index.path().to_path_buf())
}

#[test]
fn build_from_stdin_writes_index() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let index = dir.child("nested/filters.idx");

    Command::cargo_bin("pathbloom")?
        .arg("build")
        .arg(index.path())
        .write_stdin(sample_manifest())
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^Wrote 3 commits \(3 with filters, \d+ bytes\) to .+\n$")?);

    assert!(index.path().exists());
    assert!(!dir.child("nested/filters.idx.lock").path().exists());

    Ok(())
}

#[test]
fn empty_manifest_builds_readable_index() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let index = dir.child("filters.idx");

    Command::cargo_bin("pathbloom")?
        .arg("build")
        .arg(index.path())
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 0 commits (0 with filters"));

    Command::cargo_bin("pathbloom")?
        .arg("verify")
        .arg(index.path())
        .assert()
        .success()
        .stdout(predicate::str::diff("ok: 0 commits, 0 filters, 0 bloom words\n"));

    Command::cargo_bin("pathbloom")?
        .arg("ids")
        .arg(index.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    Command::cargo_bin("pathbloom")?
        .arg("lookup")
        .arg(index.path())
        .arg(commit_id(0x10, 1).to_string())
        .arg("src/lib.rs")
        .assert()
        .success()
        .stdout(predicate::str::contains("commit not in index"));

    Command::cargo_bin("pathbloom")?
        .arg("inspect")
        .arg(index.path())
        .assert()
        .success();

    Ok(())
}

#[test]
fn commits_over_path_limit_have_no_filter() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let input = dir.child("manifest.txt");
    input.write_str(&sample_manifest())?;
    let index = dir.child("filters.idx");

    Command::cargo_bin("pathbloom")?
        .arg("build")
        .arg(index.path())
        .arg("--input")
        .arg(input.path())
        .arg("--max-changed-paths")
        .arg("2")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 commits (2 with filters"));

    Command::cargo_bin("pathbloom")?
        .arg("lookup")
        .arg(index.path())
        .arg(commit_id(0x30, 3).to_string())
        .arg("anything")
        .assert()
        .success()
        .stdout(predicate::str::contains("commit has no filter"));

    Ok(())
}

#[test]
fn lookup_reports_changed_and_unchanged_paths() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let index = build_index(&dir)?;

    Command::cargo_bin("pathbloom")?
        .arg("lookup")
        .arg(&index)
        .arg(commit_id(0x10, 1).to_string())
        .arg("src/lib.rs")
        .arg("src/")
        .assert()
        .success()
        .stdout(predicate::str::contains("maybe\tsrc/lib.rs"))
        .stdout(predicate::str::contains("maybe\tsrc\n"));

    // an empty change set answers every path with a definite no
    Command::cargo_bin("pathbloom")?
        .arg("lookup")
        .arg(&index)
        .arg(commit_id(0x20, 2).to_string())
        .arg("src/lib.rs")
        .assert()
        .success()
        .stdout(predicate::str::diff("no\tsrc/lib.rs\n"));

    Command::cargo_bin("pathbloom")?
        .arg("lookup")
        .arg(&index)
        .arg(commit_id(0xff, 0).to_string())
        .arg("src/lib.rs")
        .assert()
        .success()
        .stdout(predicate::str::contains("commit not in index"));

    Ok(())
}

#[test]
fn ids_are_listed_in_ascending_order() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let index = build_index(&dir)?;

    let expected = format!(
        "{}\n{}\n{}\n",
        commit_id(0x10, 1),
        commit_id(0x20, 2),
        commit_id(0x30, 3)
    );
    Command::cargo_bin("pathbloom")?
        .arg("ids")
        .arg(&index)
        .assert()
        .success()
        .stdout(predicate::str::diff(expected));

    Command::cargo_bin("pathbloom")?
        .arg("ids")
        .arg("--abbrev")
        .arg(&index)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1000000\n2000000\n3000000\n"));

    Ok(())
}

#[test]
fn inspect_prints_chunk_table() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let index = build_index(&dir)?;

    Command::cargo_bin("pathbloom")?
        .arg("inspect")
        .arg(&index)
        .assert()
        .success()
        .stdout(predicate::str::contains("OIDF         68  fanout"))
        .stdout(predicate::str::contains("BDAT"))
        .stdout(predicate::str::contains("commits:        3"))
        .stdout(predicate::str::contains("hash functions: 7"))
        .stdout(predicate::str::contains("bits per entry: 10"));

    Ok(())
}

#[test]
fn verify_detects_corruption() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let index = build_index(&dir)?;

    Command::cargo_bin("pathbloom")?
        .arg("verify")
        .arg(&index)
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: 3 commits, 3 filters"));

    // last filter byte before the checksum: structure stays valid
    let mut bytes = std::fs::read(&index)?;
    let last_filter_byte = bytes.len() - CHECKSUM_SIZE - 1;
    bytes[last_filter_byte] ^= 0x01;
    std::fs::write(&index, bytes)?;

    Command::cargo_bin("pathbloom")?
        .arg("verify")
        .arg(&index)
        .assert()
        .failure()
        .stderr(predicate::str::contains("checksum does not match"));

    // the fast path skips hashing
    Command::cargo_bin("pathbloom")?
        .arg("--no-verify")
        .arg("ids")
        .arg(&index)
        .assert()
        .success();

    Command::cargo_bin("pathbloom")?
        .env("PATHBLOOM_NO_VERIFY", "true")
        .arg("inspect")
        .arg(&index)
        .assert()
        .success();

    Ok(())
}

#[test]
fn opening_foreign_file_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let file = dir.child("not-an-index");
    file.write_str("this is certainly not a filter index, just some text")?;

    Command::cargo_bin("pathbloom")?
        .arg("inspect")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad magic"));

    Ok(())
}

#[test]
fn malformed_manifest_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let index = dir.child("filters.idx");

    Command::cargo_bin("pathbloom")?
        .arg("build")
        .arg(index.path())
        .write_stdin("src/lib.rs\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 1"));

    assert!(!index.path().exists());

    Ok(())
}
