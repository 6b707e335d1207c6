//! Collection crawler
//!
//! Builds collections from the directory tree:
//! - `files` collections: every regular file below the collection directory
//!   is one item
//! - `directories` collections: every immediate subdirectory is one item
//!   holding all files beneath it
//!
//! A directory item may carry a `.jmtag` file (TOML, `value = N`) declaring
//! its value. Symlinks are not followed.

use crate::models::{Collection, Collector, File, Item, Value};
use jmc_common::{CollectionRule, Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Per-item tag file name
pub const TAG_FILE: &str = ".jmtag";

/// Collector metadata directory (holds the catalog)
pub const INFO_DIR: &str = ".jminfo";

#[derive(Debug, Default, Deserialize)]
struct Tag {
    #[serde(default)]
    value: Option<u8>,
}

/// Directory crawler producing collections of items
pub struct FileScanner {
    ignore_names: Vec<String>,
}

impl FileScanner {
    /// Scanner with the default ignore list (tag files, metadata and OS clutter)
    pub fn new() -> Self {
        Self {
            ignore_names: vec![
                TAG_FILE.to_string(),
                INFO_DIR.to_string(),
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
            ],
        }
    }

    /// Crawl every configured collection under `root`
    pub fn scan_collector(
        &self,
        root: &Path,
        collections: &BTreeMap<String, CollectionRule>,
    ) -> Result<Collector> {
        if !root.is_dir() {
            return Err(Error::NotFound(format!(
                "Collector root folder {}",
                root.display()
            )));
        }

        let mut collector = Collector::new(root);
        for (name, rule) in collections {
            let collection = self.scan_collection(root, name, *rule)?;
            collector.add_collection(collection)?;
        }

        info!(
            root = %root.display(),
            collections = collector.collections().len(),
            items = collector.iter_items().count(),
            files = collector.iter_files().count(),
            "Collector scanned"
        );
        Ok(collector)
    }

    /// Crawl one collection directory
    pub fn scan_collection(&self, root: &Path, name: &str, rule: CollectionRule) -> Result<Collection> {
        let mut collection = Collection::new(name, rule);
        let collection_dir = root.join(collection.path());
        if !collection_dir.is_dir() {
            return Err(Error::NotFound(format!(
                "Collection directory {}",
                collection_dir.display()
            )));
        }

        let items = match rule {
            CollectionRule::Files => self.scan_file_items(root, &collection_dir, name)?,
            CollectionRule::Directories => self.scan_directory_items(root, &collection_dir, name)?,
        };
        for item in items {
            collection.add_item(item)?;
        }

        debug!(
            collection = name,
            items = collection.items().len(),
            size = collection.total_size(),
            "Collection scanned"
        );
        Ok(collection)
    }

    fn scan_file_items(&self, root: &Path, collection_dir: &Path, name: &str) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        for (path, size) in self.walk_files(collection_dir) {
            let relative = strip(&path, collection_dir)?;
            let file_name = path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| relative.clone());
            let file = File::new(strip(&path, root)?, file_name, size);
            items.push(Item::file(name, &relative, file, Value::default()));
        }
        Ok(items)
    }

    fn scan_directory_items(&self, root: &Path, collection_dir: &Path, name: &str) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let walker = WalkDir::new(collection_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error accessing entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            let item_dir = entry.path();
            let mut files = Vec::new();
            for (path, size) in self.walk_files(item_dir) {
                files.push(File::new(strip(&path, root)?, strip(&path, item_dir)?, size));
            }
            let value = read_tag_value(item_dir)?;
            items.push(Item::directory(name, strip(item_dir, collection_dir)?, files, value)?);
        }
        Ok(items)
    }

    /// Regular files below `dir` with their sizes, unreadable entries skipped
    fn walk_files(&self, dir: &Path) -> Vec<(PathBuf, u64)> {
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e));

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => match entry.metadata() {
                    Ok(metadata) => files.push((entry.path().to_path_buf(), metadata.len())),
                    Err(e) => warn!("Cannot stat {}: {}", entry.path().display(), e),
                },
                Ok(_) => {}
                Err(e) => {
                    // Continue scanning, don't abort
                    warn!("Error accessing entry: {}", e);
                }
            }
        }
        files
    }

    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        let file_name = entry.file_name().to_string_lossy();
        !self.ignore_names.iter().any(|n| *n == file_name)
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Value declared by the `.jmtag` of a directory item, default 5
fn read_tag_value(item_dir: &Path) -> Result<Value> {
    let tag_path = item_dir.join(TAG_FILE);
    if !tag_path.is_file() {
        return Ok(Value::default());
    }

    let content = std::fs::read_to_string(&tag_path)?;
    let tag: Tag = toml::from_str(&content)
        .map_err(|e| Error::InvalidInput(format!("{}: {}", tag_path.display(), e)))?;
    match tag.value {
        Some(v) => Value::new(v)
            .map_err(|e| Error::InvalidInput(format!("{}: {}", tag_path.display(), e))),
        None => Ok(Value::default()),
    }
}

fn strip(path: &Path, base: &Path) -> Result<PathBuf> {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .map_err(|_| {
            Error::Internal(format!(
                "{} is not below {}",
                path.display(),
                base.display()
            ))
        })
}
