//! Spill directory management.
//!
//! Spill files are named `{prefix}{sorter_id}-{index:06}.run`. The sorter id
//! combines the process id with a per-process counter so that sorters in one
//! process never collide; the index increases for every file a sorter
//! creates.
//!
//! [`SpillDir::remove_all`] also sweeps stale files carrying the prefix and
//! the `.run` suffix. A file is stale when it belongs to this sorter or was
//! written by a different process, so sorters in one process can share a
//! directory and prefix. Live sorters in different processes still must not.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::sorter::SorterError;

/// Suffix of every spill file.
pub const SPILL_SUFFIX: &str = ".run";

static NEXT_SORTER_ID: AtomicU64 = AtomicU64::new(0);

/// The spill files owned by one sorter.
#[derive(Debug)]
pub struct SpillDir {
    dir: PathBuf,
    prefix: String,
    pid: u32,
    sorter_id: String,
    next_index: u64,
    files: Vec<PathBuf>,
}

impl SpillDir {
    /// Describe a spill directory. Nothing is created until the first
    /// [`create`](Self::create).
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        let sequence = NEXT_SORTER_ID.fetch_add(1, Ordering::Relaxed);
        let pid = std::process::id();
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            pid,
            sorter_id: format!("{pid}.{sequence}"),
            next_index: 0,
            files: Vec::new(),
        }
    }

    /// Directory holding the spill files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Tracked files, oldest first.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Number of tracked files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no files are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Create and track the next spill file.
    ///
    /// The file is tracked before anything is written to it, so it is removed
    /// by [`remove_all`](Self::remove_all) even if writing fails.
    pub fn create(&mut self) -> Result<(PathBuf, File), SorterError> {
        std::fs::create_dir_all(&self.dir)?;
        let name = format!(
            "{}{}-{:06}{SPILL_SUFFIX}",
            self.prefix, self.sorter_id, self.next_index
        );
        self.next_index += 1;
        let path = self.dir.join(name);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        self.files.push(path.clone());
        Ok((path, file))
    }

    /// Delete one tracked file and stop tracking it.
    pub fn remove(&mut self, path: &Path) -> Result<(), SorterError> {
        self.files.retain(|tracked| tracked != path);
        remove_if_present(path)
    }

    /// Delete every tracked file, then sweep stale files with this prefix.
    ///
    /// Keeps going after a failure and reports the first error. Returns the
    /// number of files removed.
    pub fn remove_all(&mut self) -> Result<usize, SorterError> {
        let mut removed = 0;
        let mut first_error = None;

        for path in std::mem::take(&mut self.files) {
            match remove_if_present(&path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "failed to remove spill file: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        match self.sweep() {
            Ok(swept) => removed += swept,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), "failed to sweep spill directory: {e}");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(removed), Err)
    }

    /// Whether `name` is a spill file this sorter may sweep: one of its own,
    /// or one whose owner is not a sorter of this process.
    fn is_stale(&self, name: &str) -> bool {
        let Some(stem) = name
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_suffix(SPILL_SUFFIX))
        else {
            return false;
        };
        let owner = stem.rsplit_once('-').map_or(stem, |(owner, _)| owner);
        if owner == self.sorter_id {
            return true;
        }
        let pid = owner.split_once('.').map_or(owner, |(pid, _)| pid);
        pid.parse::<u32>().ok() != Some(self.pid)
    }

    fn sweep(&self) -> Result<usize, SorterError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut swept = 0;
        for entry in entries {
            let entry = entry?;
            let stale = entry.file_name().to_str().is_some_and(|n| self.is_stale(n));
            if stale && entry.file_type()?.is_file() {
                remove_if_present(&entry.path())?;
                tracing::debug!(path = %entry.path().display(), "swept stale spill file");
                swept += 1;
            }
        }
        Ok(swept)
    }
}

fn remove_if_present(path: &Path) -> Result<(), SorterError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
