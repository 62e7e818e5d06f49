// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! A `SourceTree` is the read-only view a buildpack gets of an uploaded
//! tarball's contents, abstracted so detection and generation logic never
//! touch the filesystem directly and tests can substitute an in-memory tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub trait SourceTree: Send + Sync {
    fn exists(&self, relative_path: &str) -> bool;
    fn read_to_string(&self, relative_path: &str) -> Option<String>;
    /// Any path under `dir` that exists, matched by a glob-ish suffix check
    /// (good enough for markers like `next.config.*`).
    fn any_matching(&self, dir: &str, suffix_patterns: &[&str]) -> bool;
    fn total_size_bytes(&self) -> u64;
}

/// In-memory tree, built from literal file contents — used by buildpack
/// detection tests and by the app manager when it already has the
/// extracted tarball contents in hand.
#[derive(Debug, Default, Clone)]
pub struct MemorySourceTree {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySourceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl SourceTree for MemorySourceTree {
    fn exists(&self, relative_path: &str) -> bool {
        self.files.contains_key(relative_path)
    }

    fn read_to_string(&self, relative_path: &str) -> Option<String> {
        self.files.get(relative_path).map(|b| String::from_utf8_lossy(b).into_owned())
    }

    fn any_matching(&self, dir: &str, suffix_patterns: &[&str]) -> bool {
        self.files.keys().any(|path| {
            path.starts_with(dir) && suffix_patterns.iter().any(|p| path.ends_with(p.trim_start_matches('*')))
        })
    }

    fn total_size_bytes(&self) -> u64 {
        self.files.values().map(|v| v.len() as u64).sum()
    }
}

/// Real filesystem tree rooted at an already-extracted tarball directory.
pub struct FsSourceTree {
    root: PathBuf,
}

impl FsSourceTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceTree for FsSourceTree {
    fn exists(&self, relative_path: &str) -> bool {
        self.root.join(relative_path).exists()
    }

    fn read_to_string(&self, relative_path: &str) -> Option<String> {
        std::fs::read_to_string(self.root.join(relative_path)).ok()
    }

    fn any_matching(&self, dir: &str, suffix_patterns: &[&str]) -> bool {
        let Ok(entries) = std::fs::read_dir(self.root.join(dir)) else { return false };
        entries.filter_map(Result::ok).any(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            suffix_patterns.iter().any(|p| name.ends_with(p.trim_start_matches('*')))
        })
    }

    fn total_size_bytes(&self) -> u64 {
        fn walk(dir: &Path) -> u64 {
            let Ok(entries) = std::fs::read_dir(dir) else { return 0 };
            entries
                .filter_map(Result::ok)
                .map(|entry| {
                    let path = entry.path();
                    if path.is_dir() {
                        walk(&path)
                    } else {
                        entry.metadata().map(|m| m.len()).unwrap_or(0)
                    }
                })
                .sum()
        }
        walk(&self.root)
    }
}
