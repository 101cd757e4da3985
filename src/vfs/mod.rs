//! Virtual filesystem for program sources.
//!
//! The loader reads `.hol` sources through [`VirtualFs`] so it works the same
//! against the OS filesystem ([`NativeFs`], feature `native`) and an
//! in-memory tree ([`MemoryFs`]) used by tests and embedded hosts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HoloResult;

/// A single directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VfsDirEntry {
    pub name: String,
    pub is_file: bool,
    pub is_dir: bool,
}

/// Storage backend for program sources.
///
/// Paths are logical, forward-slash separated and relative to the backend's
/// root. Backends with a real filesystem also accept absolute paths.
#[async_trait]
pub trait VirtualFs: Send + Sync {
    async fn read_to_string(&self, path: &str) -> HoloResult<String>;

    /// True for files and directories.
    async fn exists(&self, path: &str) -> HoloResult<bool>;

    /// True only for regular files.
    async fn is_file(&self, path: &str) -> HoloResult<bool>;

    /// Direct children of a directory, sorted by name.
    async fn read_dir(&self, path: &str) -> HoloResult<Vec<VfsDirEntry>>;
}

/// Join a directory and a relative path; an empty or `.` directory is the
/// root.
pub fn join(dir: &str, path: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        path.trim_start_matches('/').to_string()
    } else {
        format!("{dir}/{}", path.trim_start_matches('/'))
    }
}

mod memory;
pub use memory::MemoryFs;

#[cfg(feature = "native")]
mod native;
#[cfg(feature = "native")]
pub use native::NativeFs;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HoloError;

    #[test]
    fn join_paths() {
        assert_eq!(join("prompts", "a.hol"), "prompts/a.hol");
        assert_eq!(join("prompts/", "/a.hol"), "prompts/a.hol");
        assert_eq!(join(".", "a.hol"), "a.hol");
        assert_eq!(join("", "a.hol"), "a.hol");
    }

    #[tokio::test]
    async fn memory_fs_insert_and_read() {
        let fs = MemoryFs::new();
        fs.insert("hol/a.hol", "<|o_o|>hi");
        assert_eq!(fs.read_to_string("hol/a.hol").await.unwrap(), "<|o_o|>hi");
        assert_eq!(fs.read_to_string("/hol/a.hol").await.unwrap(), "<|o_o|>hi");
    }

    #[tokio::test]
    async fn memory_fs_missing_file_is_io_not_found() {
        let fs = MemoryFs::new();
        let err = fs.read_to_string("nope.hol").await.unwrap_err();
        assert!(matches!(err, HoloError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn memory_fs_exists_covers_parent_dirs() {
        let fs = MemoryFs::new().with_file("a/b/c.hol", "");
        assert!(fs.exists("a/b/c.hol").await.unwrap());
        assert!(fs.exists("a/b").await.unwrap());
        assert!(fs.exists("a").await.unwrap());
        assert!(!fs.exists("a/c").await.unwrap());

        assert!(fs.is_file("a/b/c.hol").await.unwrap());
        assert!(!fs.is_file("a/b").await.unwrap());
        assert!(!fs.is_file("a/c").await.unwrap());
    }

    #[tokio::test]
    async fn memory_fs_read_dir_lists_direct_children() {
        let fs = MemoryFs::new()
            .with_file("dir/b.hol", "b")
            .with_file("dir/a.hol", "a")
            .with_file("dir/sub/c.hol", "c");

        let entries = fs.read_dir("dir").await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.hol", "b.hol", "sub"]);
        assert!(entries[2].is_dir);
        assert!(fs.read_dir("missing").await.is_err());
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn native_fs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("prompts")).unwrap();
        std::fs::write(dir.path().join("prompts/a.hol"), "<|o_o|>native").unwrap();

        let fs = NativeFs::new(dir.path());
        assert!(fs.exists("prompts/a.hol").await.unwrap());
        assert!(fs.is_file("prompts/a.hol").await.unwrap());
        assert!(fs.exists("prompts").await.unwrap());
        assert!(!fs.is_file("prompts").await.unwrap());
        assert!(!fs.is_file("prompts/missing.hol").await.unwrap());
        assert_eq!(fs.read_to_string("prompts/a.hol").await.unwrap(), "<|o_o|>native");

        let entries = fs.read_dir("prompts").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_file);
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn native_fs_reads_absolute_paths_outside_root() {
        let root = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let file = elsewhere.path().join("abs.hol");
        std::fs::write(&file, "<|o_o|>abs").unwrap();

        let fs = NativeFs::new(root.path());
        let path = file.to_string_lossy();
        assert!(fs.is_file(&path).await.unwrap());
        assert_eq!(fs.read_to_string(&path).await.unwrap(), "<|o_o|>abs");
    }
}
