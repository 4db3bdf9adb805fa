//! Atomic index publication
//!
//! The new index is written to `<target>.lock`, created exclusively so two
//! writers cannot interleave, synced to disk and renamed over the target. On
//! any failure the lock file is removed and the previous index is untouched.

use crate::artifacts::core::{Error, Result};
use file_guard::Lock;
use std::fs::{File, OpenOptions};
use std::io;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Lockfile {
    target: PathBuf,
    lock_path: PathBuf,
}

impl Lockfile {
    pub fn new(target: &Path) -> Self {
        let mut lock_path = target.as_os_str().to_owned();
        lock_path.push(".lock");

        Lockfile {
            target: target.to_path_buf(),
            lock_path: PathBuf::from(lock_path),
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Run `write` against the lock file, then rename it over the target
    pub fn publish<T, F>(&self, write: F) -> Result<T>
    where
        F: FnOnce(&mut File) -> Result<T>,
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.lock_path())
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => Error::Io(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!(
                        "unable to create {}: another writer holds the lock",
                        self.lock_path().display()
                    ),
                )),
                _ => Error::Io(e),
            })?;

        let written = Self::write_locked(&mut file, write);
        drop(file);

        match written {
            Ok(value) => {
                if let Err(e) = std::fs::rename(self.lock_path(), &self.target) {
                    let _ = std::fs::remove_file(self.lock_path());
                    return Err(e.into());
                }
                tracing::info!(path = %self.target.display(), "published filter index");
                Ok(value)
            }
            Err(e) => {
                let _ = std::fs::remove_file(self.lock_path());
                Err(e)
            }
        }
    }

    fn write_locked<T, F>(file: &mut File, write: F) -> Result<T>
    where
        F: FnOnce(&mut File) -> Result<T>,
    {
        let mut lock = file_guard::lock(file, Lock::Exclusive, 0, 1)?;
        let value = write(lock.deref_mut())?;
        lock.deref_mut().sync_all()?;
        Ok(value)
    }
}
