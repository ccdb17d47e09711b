// src/pipeline/fileset.rs

use std::path::{Path, PathBuf};

/// One file flowing through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the glob base; decides where the file is written.
    pub path: PathBuf,
    /// Where the file was read from, if it came from disk.
    pub origin: Option<PathBuf>,
    pub contents: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            origin: None,
            contents: contents.into(),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// `path` with forward slashes, as matched by `when` globs.
    pub fn rel_str(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

/// Ordered collection of files.
///
/// Kept sorted by `path` so that the same inputs always produce the same
/// output tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<SourceFile>,
}

impl FileSet {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    pub fn from_files(files: impl IntoIterator<Item = SourceFile>) -> Self {
        let mut set = Self {
            files: files.into_iter().collect(),
        };
        set.normalize();
        set
    }

    /// Insert a file, replacing and returning any existing file with the
    /// same path.
    pub fn insert(&mut self, file: SourceFile) -> Option<SourceFile> {
        match self.files.binary_search_by(|f| f.path.cmp(&file.path)) {
            Ok(idx) => Some(std::mem::replace(&mut self.files[idx], file)),
            Err(idx) => {
                self.files.insert(idx, file);
                None
            }
        }
    }

    pub fn get(&self, path: &Path) -> Option<&SourceFile> {
        self.files
            .binary_search_by(|f| f.path.as_path().cmp(path))
            .ok()
            .map(|idx| &self.files[idx])
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.contents.len()).sum()
    }

    /// Sort by path; on duplicate paths the last file wins.
    fn normalize(&mut self) {
        self.files.sort_by(|a, b| a.path.cmp(&b.path));
        let mut deduped: Vec<SourceFile> = Vec::with_capacity(self.files.len());
        for file in self.files.drain(..) {
            match deduped.last_mut() {
                Some(last) if last.path == file.path => *last = file,
                _ => deduped.push(file),
            }
        }
        self.files = deduped;
    }
}

impl IntoIterator for FileSet {
    type Item = SourceFile;
    type IntoIter = std::vec::IntoIter<SourceFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl FromIterator<SourceFile> for FileSet {
    fn from_iter<I: IntoIterator<Item = SourceFile>>(iter: I) -> Self {
        FileSet::from_files(iter)
    }
}
