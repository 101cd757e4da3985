//! In-memory source tree.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{HoloError, HoloResult};

use super::{VfsDirEntry, VirtualFs};

/// In-memory filesystem keyed by normalized path. Directories exist
/// implicitly as prefixes of stored files.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: DashMap<String, String>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_file(self, path: &str, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&self, path: &str, contents: impl Into<String>) {
        self.files.insert(normalize(path), contents.into());
    }

    fn is_dir(&self, path: &str) -> bool {
        if path.is_empty() {
            return true;
        }
        let prefix = format!("{path}/");
        self.files.iter().any(|f| f.key().starts_with(&prefix))
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn not_found(what: &str, path: &str) -> HoloError {
    HoloError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("{what} not found: {path}"),
    ))
}

#[async_trait]
impl VirtualFs for MemoryFs {
    async fn read_to_string(&self, path: &str) -> HoloResult<String> {
        let path = normalize(path);
        self.files
            .get(&path)
            .map(|f| f.value().clone())
            .ok_or_else(|| not_found("file", &path))
    }

    async fn exists(&self, path: &str) -> HoloResult<bool> {
        let path = normalize(path);
        Ok(self.files.contains_key(&path) || self.is_dir(&path))
    }

    async fn is_file(&self, path: &str) -> HoloResult<bool> {
        Ok(self.files.contains_key(&normalize(path)))
    }

    async fn read_dir(&self, path: &str) -> HoloResult<Vec<VfsDirEntry>> {
        let path = normalize(path);
        if !self.is_dir(&path) {
            return Err(not_found("directory", &path));
        }
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };

        let mut files = BTreeSet::new();
        let mut dirs = BTreeSet::new();
        for entry in self.files.iter() {
            let Some(rest) = entry.key().strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((dir, _)) => dirs.insert(dir.to_string()),
                None => files.insert(rest.to_string()),
            };
        }

        let mut entries: Vec<VfsDirEntry> = files
            .into_iter()
            .map(|name| VfsDirEntry {
                name,
                is_file: true,
                is_dir: false,
            })
            .chain(dirs.into_iter().map(|name| VfsDirEntry {
                name,
                is_file: false,
                is_dir: true,
            }))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
