//! Program loader: resolves names against search paths and caches parsed
//! programs.

use std::path::{is_separator, Path};
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::HoloConfig;
use crate::error::{HoloError, HoloResult};
use crate::holoware::Holoware;
use crate::vfs::{self, VirtualFs};

/// File extension of program sources.
pub const EXTENSION: &str = "hol";

/// Loads `.hol` programs through a [`VirtualFs`].
///
/// Parsed programs are cached by the name they were requested under and
/// shared as `Arc<Holoware>`; the first parse wins.
pub struct HolowareLoader {
    fs: Arc<dyn VirtualFs>,
    config: HoloConfig,
    cache: DashMap<String, Arc<Holoware>>,
}

impl HolowareLoader {
    pub fn new(fs: Arc<dyn VirtualFs>, config: HoloConfig) -> Self {
        Self {
            fs,
            config,
            cache: DashMap::new(),
        }
    }

    /// Loader over the OS filesystem rooted at `root`, with default config.
    #[cfg(feature = "native")]
    pub fn native(root: impl Into<std::path::PathBuf>) -> Self {
        Self::new(
            Arc::new(crate::vfs::NativeFs::new(root)),
            HoloConfig::default(),
        )
    }

    pub fn config(&self) -> &HoloConfig {
        &self.config
    }

    /// Paths tried for `name`, in order.
    fn candidates(&self, name: &str) -> Vec<String> {
        let mut files = vec![name.to_string()];
        if !name.ends_with(&format!(".{EXTENSION}")) {
            files.push(format!("{name}.{EXTENSION}"));
        }

        let mut paths = Vec::new();
        if name.chars().any(is_separator) {
            paths.extend(files.iter().cloned());
        }
        if Path::new(name).is_absolute() {
            return paths;
        }
        for dir in &self.config.search_paths {
            paths.extend(files.iter().map(|file| vfs::join(dir, file)));
        }
        paths
    }

    /// Load a program by name, parsing it on first use. Only regular files
    /// match; a directory named like the program is skipped.
    pub async fn load(&self, name: &str) -> HoloResult<Arc<Holoware>> {
        if let Some(cached) = self.cache.get(name) {
            return Ok(cached.value().clone());
        }

        let searched = self.candidates(name);
        let mut found = None;
        for path in &searched {
            if self.fs.is_file(path).await? {
                found = Some(path.clone());
                break;
            }
        }
        let Some(path) = found else {
            return Err(HoloError::NotFound {
                name: name.to_string(),
                searched,
            });
        };

        let source = self.fs.read_to_string(&path).await?;
        let ware = Holoware::parse(&source)?
            .with_name(name)
            .with_source_path(&path);
        tracing::debug!(name, path = %path, spans = ware.len(), "loaded program");
        Ok(self.insert(name, ware))
    }

    /// Parse an in-memory source and cache it under `name`.
    pub fn parse_str(&self, name: &str, source: &str) -> HoloResult<Arc<Holoware>> {
        let ware = Holoware::parse(source)?.with_name(name);
        Ok(self.insert(name, ware))
    }

    /// Load every `.hol` file directly inside each search directory.
    /// Returns the number of programs loaded; files that fail to parse are
    /// skipped with a warning.
    pub async fn load_all(&self) -> HoloResult<usize> {
        let mut count = 0;
        for dir in &self.config.search_paths {
            if !self.fs.exists(dir).await? {
                continue;
            }
            for entry in self.fs.read_dir(dir).await? {
                let Some(stem) = entry
                    .name
                    .strip_suffix(EXTENSION)
                    .and_then(|s| s.strip_suffix('.'))
                else {
                    continue;
                };
                if !entry.is_file || self.cache.contains_key(stem) {
                    continue;
                }
                match self.load(stem).await {
                    Ok(_) => count += 1,
                    Err(err) => tracing::warn!(file = %entry.name, error = %err, "skipping program"),
                }
            }
        }
        Ok(count)
    }

    fn insert(&self, name: &str, ware: Holoware) -> Arc<Holoware> {
        self.cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ware))
            .value()
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Holoware>> {
        self.cache.get(name).map(|r| r.value().clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.cache.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop every cached program.
    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryFs;

    const GREETING: &str = "<|x_x|>Be brief.\n<|o_o|>Hello";

    fn loader(fs: MemoryFs) -> HolowareLoader {
        HolowareLoader::new(Arc::new(fs), HoloConfig::default())
    }

    #[tokio::test]
    async fn loads_from_search_paths_in_order() {
        let fs = MemoryFs::new()
            .with_file("prompts/greet.hol", GREETING)
            .with_file("hol/greet.hol", "<|o_o|>shadowed");
        let loader = loader(fs);

        let ware = loader.load("greet").await.unwrap();
        assert_eq!(ware.name.as_deref(), Some("greet"));
        assert_eq!(
            ware.source_path.as_deref(),
            Some(std::path::Path::new("prompts/greet.hol"))
        );
        assert_eq!(ware.spans[1].text(), Some("Be brief.\n"));
    }

    #[tokio::test]
    async fn falls_back_to_later_search_path() {
        let loader = loader(MemoryFs::new().with_file("hol/greet.hol", GREETING));
        assert!(loader.load("greet.hol").await.is_ok());
    }

    #[tokio::test]
    async fn names_with_separator_are_tried_directly() {
        let loader = loader(MemoryFs::new().with_file("custom/dir/a.hol", GREETING));
        let ware = loader.load("custom/dir/a.hol").await.unwrap();
        assert_eq!(ware.display_name(), "custom/dir/a.hol");
    }

    #[tokio::test]
    async fn directory_with_program_name_is_skipped() {
        let fs = MemoryFs::new()
            .with_file("prompts/greet.hol", GREETING)
            .with_file("prompts/greet/notes.txt", "not a program");
        let ware = loader(fs).load("greet").await.unwrap();
        assert_eq!(
            ware.source_path.as_deref(),
            Some(std::path::Path::new("prompts/greet.hol"))
        );
    }

    #[tokio::test]
    async fn missing_program_lists_searched_paths() {
        let loader = loader(MemoryFs::new());
        let err = loader.load("nope").await.unwrap_err();
        match err {
            HoloError::NotFound { name, searched } => {
                assert_eq!(name, "nope");
                assert_eq!(
                    searched,
                    vec!["prompts/nope", "prompts/nope.hol", "hol/nope", "hol/nope.hol"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn cache_returns_the_same_program() {
        let fs = Arc::new(MemoryFs::new().with_file("prompts/greet.hol", GREETING));
        let loader = HolowareLoader::new(fs.clone(), HoloConfig::default());
        let first = loader.load("greet").await.unwrap();

        fs.insert("prompts/greet.hol", "<|o_o|>changed");
        let second = loader.load("greet").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        loader.clear();
        assert!(loader.is_empty());
        let third = loader.load("greet").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[tokio::test]
    async fn parse_errors_surface() {
        let loader = loader(MemoryFs::new().with_file("prompts/bad.hol", "<|o_o|><|unclosed"));
        let err = loader.load("bad").await.unwrap_err();
        assert!(err.is_parse_error());
        assert!(loader.is_empty());
    }

    #[test]
    fn parse_str_caches() {
        let loader = loader(MemoryFs::new());
        let ware = loader.parse_str("inline", GREETING).unwrap();
        assert_eq!(ware.display_name(), "inline");
        assert!(loader.get("inline").is_some());
        assert_eq!(loader.names(), vec!["inline".to_string()]);
        assert_eq!(loader.len(), 1);
    }

    #[tokio::test]
    async fn load_all_skips_broken_files() {
        let fs = MemoryFs::new()
            .with_file("prompts/a.hol", GREETING)
            .with_file("prompts/b.hol", "<|o_o|>fine")
            .with_file("prompts/broken.hol", "<|o_o|><|nope")
            .with_file("prompts/readme.md", "not a program");
        let loader = loader(fs);
        assert_eq!(loader.load_all().await.unwrap(), 2);
        let mut names = loader.names();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn native_loader_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("prompts")).unwrap();
        std::fs::write(dir.path().join("prompts/disk.hol"), GREETING).unwrap();

        let loader = HolowareLoader::native(dir.path());
        let ware = loader.load("disk").await.unwrap();
        assert_eq!(ware.len(), 4);
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn native_loader_takes_absolute_paths_directly() {
        let root = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let file = elsewhere.path().join("abs.hol");
        std::fs::write(&file, GREETING).unwrap();

        let loader = HolowareLoader::native(root.path());
        let name = file.to_string_lossy().into_owned();
        let ware = loader.load(&name).await.unwrap();
        assert_eq!(ware.source_path.as_deref(), Some(file.as_path()));

        let missing = elsewhere.path().join("gone").to_string_lossy().into_owned();
        match loader.load(&missing).await.unwrap_err() {
            HoloError::NotFound { searched, .. } => {
                assert_eq!(searched, vec![missing.clone(), format!("{missing}.hol")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
