//! OS filesystem backed by `tokio::fs`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::HoloResult;

use super::{VfsDirEntry, VirtualFs};

/// Relative paths resolve under `root`; absolute paths are used as given.
#[derive(Debug, Clone)]
pub struct NativeFs {
    root: PathBuf,
}

impl NativeFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl VirtualFs for NativeFs {
    async fn read_to_string(&self, path: &str) -> HoloResult<String> {
        Ok(tokio::fs::read_to_string(self.resolve(path)).await?)
    }

    async fn exists(&self, path: &str) -> HoloResult<bool> {
        Ok(tokio::fs::try_exists(self.resolve(path)).await?)
    }

    async fn is_file(&self, path: &str) -> HoloResult<bool> {
        match tokio::fs::metadata(self.resolve(path)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn read_dir(&self, path: &str) -> HoloResult<Vec<VfsDirEntry>> {
        let mut reader = tokio::fs::read_dir(self.resolve(path)).await?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let file_type = entry.file_type().await?;
            entries.push(VfsDirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_file: file_type.is_file(),
                is_dir: file_type.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
