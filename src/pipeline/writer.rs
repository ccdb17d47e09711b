// src/pipeline/writer.rs

//! Destination writes.
//!
//! Tasks run concurrently and two of them may target the same output path
//! (an `images` task and a `fonts` task both writing into `dist/`). Writes
//! to one path are serialised behind a per-path async lock; writes to
//! different paths proceed in parallel. A path's lock is dropped from the
//! table once no write holds or awaits it.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use tracing::trace;

use crate::fs::FileSystem;

pub struct OutputWriter {
    fs: Arc<dyn FileSystem>,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl fmt::Debug for OutputWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputWriter").field("fs", &self.fs).finish()
    }
}

impl OutputWriter {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, path: &Path) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| anyhow!("writer lock table poisoned"))?;
        Ok(locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }

    /// Forget `path`'s lock if the table holds the only reference.
    fn release(&self, path: &Path) -> Result<()> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| anyhow!("writer lock table poisoned"))?;
        if locks.get(path).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(path);
        }
        Ok(())
    }

    /// Number of paths that currently have a lock entry.
    pub fn tracked_paths(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    /// Write `contents` to `path`, creating intermediate directories.
    pub async fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let lock = self.lock_for(path)?;
        let result = {
            let _guard = lock.lock().await;
            trace!(path = ?path, bytes = contents.len(), "writing output");
            self.fs.write(path, contents)
        };
        drop(lock);
        self.release(path)?;
        result
    }
}
