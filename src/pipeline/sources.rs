// src/pipeline/sources.rs

//! Glob resolution for task sources.
//!
//! Patterns are relative to the project root. Entries prefixed with `!` are
//! exclusions and are subtracted after all inclusions have matched. `*` and
//! `?` never cross a `/`; use `**` to descend into directories.

use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::fs::FileSystem;
use crate::pipeline::fileset::{FileSet, SourceFile};

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Compile a single glob with path-aware wildcard semantics.
pub fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(normalize_pattern(pattern))
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?);
    }
    Ok(builder.build()?)
}

/// Split a pattern list into (inclusions, exclusions), stripping the `!`.
pub fn split_patterns(patterns: &[String]) -> (Vec<String>, Vec<String>) {
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    for pat in patterns {
        match pat.strip_prefix('!') {
            Some(rest) => exclude.push(rest.to_string()),
            None => include.push(pat.clone()),
        }
    }
    (include, exclude)
}

/// Leading directory components of `pattern` that contain no glob
/// metacharacters. For a pattern without any glob, the parent directory.
///
/// `src/styles/*.css` -> `src/styles`, `src/images/**/*` -> `src/images`,
/// `src/index.html` -> `src`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let pattern = normalize_pattern(pattern);
    let path = Path::new(pattern);

    if !pattern.contains(GLOB_META) {
        return path.parent().map(Path::to_path_buf).unwrap_or_default();
    }

    let mut base = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) if !part.to_string_lossy().contains(GLOB_META) => {
                base.push(part)
            }
            _ => break,
        }
    }
    base
}

fn normalize_pattern(pattern: &str) -> &str {
    pattern.trim_start_matches("./")
}

struct IncludePattern {
    pattern: String,
    matcher: GlobMatcher,
    base: PathBuf,
}

/// Compiled source patterns for one task.
pub struct SourceGlobs {
    includes: Vec<IncludePattern>,
    excludes: Vec<String>,
    exclude_set: Option<GlobSet>,
    base_override: Option<PathBuf>,
}

impl fmt::Debug for SourceGlobs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceGlobs")
            .field(
                "includes",
                &self.includes.iter().map(|i| &i.pattern).collect::<Vec<_>>(),
            )
            .field("excludes", &self.excludes)
            .field("base_override", &self.base_override)
            .finish()
    }
}

impl SourceGlobs {
    /// Compile `patterns` (with `!` exclusions). `base` overrides the
    /// per-pattern glob base.
    pub fn new(patterns: &[String], base: Option<&str>) -> Result<Self> {
        let (include, exclude) = split_patterns(patterns);

        let includes = include
            .iter()
            .map(|pattern| {
                let matcher = compile_glob(pattern)?.compile_matcher();
                Ok(IncludePattern {
                    pattern: pattern.clone(),
                    matcher,
                    base: glob_base(pattern),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(&exclude).context("building exclude globset")?)
        };

        Ok(Self {
            includes,
            excludes: exclude,
            exclude_set,
            base_override: base.map(|b| PathBuf::from(normalize_pattern(b))),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty()
    }

    /// True if `rel_path` (relative to the project root, forward slashes)
    /// is selected by these patterns.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.includes.iter().any(|i| i.matcher.is_match(rel_path)) && !self.is_excluded(rel_path)
    }

    fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclude_set
            .as_ref()
            .is_some_and(|set| set.is_match(rel_path))
    }

    /// Read every matching file under `root` into a [`FileSet`].
    pub fn resolve(&self, fs: &dyn FileSystem, root: &Path) -> Result<FileSet> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut files = Vec::new();

        for include in self.includes.iter() {
            let walk_root = if include.base.as_os_str().is_empty() {
                root.to_path_buf()
            } else {
                root.join(&include.base)
            };

            if !fs.is_dir(&walk_root) {
                debug!(pattern = %include.pattern, dir = ?walk_root, "glob base does not exist; no matches");
                continue;
            }

            for path in walk_files(fs, &walk_root)? {
                let Ok(rel) = path.strip_prefix(root) else {
                    continue;
                };
                let rel_str = rel.to_string_lossy().replace('\\', "/");

                if !include.matcher.is_match(&rel_str) || self.is_excluded(&rel_str) {
                    continue;
                }
                if !seen.insert(path.clone()) {
                    continue;
                }

                let base = self.base_override.as_ref().unwrap_or(&include.base);
                let rel_to_base = Path::new(&rel_str)
                    .strip_prefix(base)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| PathBuf::from(&rel_str));

                let contents = fs.read(&path)?;
                files.push(SourceFile::new(rel_to_base, contents).with_origin(path));
            }
        }

        let set = FileSet::from_files(files);
        debug!(matched = set.len(), "resolved source globs");
        Ok(set)
    }
}

/// Collect every file below `dir`.
fn walk_files(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                files.push(path);
            }
        }
    }

    Ok(files)
}
