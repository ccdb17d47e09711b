// src/pipeline/cache.rs

//! Content-addressed cache for expensive stages.
//!
//! A cache key is a blake3 hash over everything that can change a stage's
//! output for one file: the stage fingerprint (its command line), the build
//! mode, the file path and the file contents.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use tracing::{debug, trace};

use crate::fs::FileSystem;
use crate::types::Mode;

/// Directory (below the project root) used by [`FileCacheStore`].
pub const CACHE_DIR: &str = ".assetflow/cache";

/// Compute the cache key for one file passing through one stage.
pub fn cache_key(fingerprint: &str, mode: Mode, path: &Path, contents: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(fingerprint.as_bytes());
    hasher.update(&[0]);
    hasher.update(mode.as_str().as_bytes());
    hasher.update(&[0]);
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(&[0]);
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}

/// Abstract storage for cached stage outputs.
pub trait CacheStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, contents: &[u8]) -> Result<()>;
}

/// Stores outputs as one file per key under `<root>/.assetflow/cache`.
#[derive(Debug)]
pub struct FileCacheStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileCacheStore {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { root, fs }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(CACHE_DIR).join(key)
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key);
        if !self.fs.is_file(&path) {
            trace!(key = %key, "cache miss (file)");
            return Ok(None);
        }
        let contents = self.fs.read(&path)?;
        debug!(key = %key, bytes = contents.len(), "cache hit (file)");
        Ok(Some(contents))
    }

    fn put(&self, key: &str, contents: &[u8]) -> Result<()> {
        let path = self.entry_path(key);
        self.fs.write(&path, contents)?;
        debug!(key = %key, bytes = contents.len(), "stored cache entry (file)");
        Ok(())
    }
}

/// Keeps outputs in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    map: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let map = self
            .map
            .lock()
            .map_err(|_| anyhow!("memory cache lock poisoned"))?;
        let hit = map.get(key).cloned();
        if hit.is_some() {
            debug!(key = %key, "cache hit (memory)");
        }
        Ok(hit)
    }

    fn put(&self, key: &str, contents: &[u8]) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .map_err(|_| anyhow!("memory cache lock poisoned"))?;
        map.insert(key.to_string(), contents.to_vec());
        debug!(key = %key, bytes = contents.len(), "stored cache entry (memory)");
        Ok(())
    }
}
