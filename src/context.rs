// src/context.rs

//! Per-invocation build context.
//!
//! Built once before the scheduler starts and shared by `Arc` with every
//! task run. Nothing in here changes after construction, so the mode and
//! the `fail_fast` flag are the same for every task of an invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::cache::{CacheStore, FileCacheStore, MemoryCacheStore};
use crate::pipeline::writer::OutputWriter;
use crate::types::{CacheStorageMode, Mode};

#[derive(Debug)]
pub struct BuildContext {
    mode: Mode,
    fail_fast: bool,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    writer: OutputWriter,
    cache: Arc<dyn CacheStore>,
}

impl BuildContext {
    /// Context backed by the real filesystem.
    pub fn new(
        root: impl Into<PathBuf>,
        mode: Mode,
        fail_fast: bool,
        cache_storage: CacheStorageMode,
    ) -> Self {
        let root = root.into();
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let cache: Arc<dyn CacheStore> = match cache_storage {
            CacheStorageMode::File => Arc::new(FileCacheStore::new(root.clone(), fs.clone())),
            CacheStorageMode::Memory => Arc::new(MemoryCacheStore::new()),
        };
        Self::with_parts(root, mode, fail_fast, fs, cache)
    }

    /// Context with an explicit filesystem and cache (used by tests).
    pub fn with_parts(
        root: impl Into<PathBuf>,
        mode: Mode,
        fail_fast: bool,
        fs: Arc<dyn FileSystem>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        let writer = OutputWriter::new(fs.clone());
        Self {
            mode,
            fail_fast,
            root: root.into(),
            fs,
            writer,
            cache,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// `true` for one-shot builds: the first transform error aborts.
    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn writer(&self) -> &OutputWriter {
        &self.writer
    }

    pub fn cache(&self) -> &dyn CacheStore {
        self.cache.as_ref()
    }

    /// Resolve a project-relative path against the root.
    pub fn resolve(&self, rel: &Path) -> PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.root.join(rel)
        }
    }
}
