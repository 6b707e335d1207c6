//! Archival decision unit
//!
//! An item is either a single file or a directory of files. Both share the
//! same capability set: size, digest, value and volume history.

use super::{slash_path, Digest, File, VolumeId};
use crate::services::{alpha_scorer, content_hasher};
use jmc_common::{DigestAlgorithm, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Declared importance of an item, 1 (keep once) to 10 (always include)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Value(u8);

impl Value {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;
    pub const DEFAULT: u8 = 5;

    pub fn new(value: u8) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(Error::InvalidInput(format!(
                "Item value must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Value {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<u8> for Value {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Value::new(value)
    }
}

impl From<Value> for u8 {
    fn from(value: Value) -> Self {
        value.0
    }
}

/// Item content variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemContent {
    /// A single file; the item digest is the file digest
    File { file: File },
    /// Files sorted by their path relative to the item
    Directory { files: Vec<File> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    name: String,
    /// Name of the owning collection
    collection: String,
    /// Path relative to the collection directory, `/`-separated
    relative_path: String,
    size: u64,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    digest: Option<Digest>,
    /// Volumes already containing this item, strictly increasing
    #[serde(default)]
    volumes: Vec<VolumeId>,
    content: ItemContent,
}

impl Item {
    /// Item made of one file
    pub fn file(collection: &str, relative_path: impl AsRef<Path>, file: File, value: Value) -> Self {
        let relative_path = slash_path(relative_path.as_ref());
        Self {
            name: item_name(&relative_path),
            collection: collection.to_string(),
            size: file.size(),
            value,
            digest: file.digest().cloned(),
            volumes: Vec::new(),
            relative_path,
            content: ItemContent::File { file },
        }
    }

    /// Item made of a directory of files
    ///
    /// Members are put in canonical order (by path relative to the item) so
    /// the composite digest does not depend on discovery order.
    pub fn directory(
        collection: &str,
        relative_path: impl AsRef<Path>,
        mut files: Vec<File>,
        value: Value,
    ) -> Result<Self> {
        files.sort_by(|a, b| a.relative_path().cmp(b.relative_path()));
        if let Some(pair) = files
            .windows(2)
            .find(|w| w[0].relative_path() == w[1].relative_path())
        {
            return Err(Error::InvalidInput(format!(
                "Duplicate member {} in directory item",
                pair[0].relative_path()
            )));
        }

        let relative_path = slash_path(relative_path.as_ref());
        Ok(Self {
            name: item_name(&relative_path),
            collection: collection.to_string(),
            size: files.iter().map(File::size).sum(),
            value,
            digest: None,
            volumes: Vec::new(),
            relative_path,
            content: ItemContent::Directory { files },
        })
    }

    /// Attach the volume history delivered by the crawler or a catalog
    pub fn with_history(mut self, volumes: Vec<VolumeId>) -> Result<Self> {
        self.replace_history(volumes)?;
        Ok(self)
    }

    /// Stable identifier: `"<collection>/<relative_path>"`
    pub fn id(&self) -> String {
        format!("{}/{}", self.collection, self.relative_path)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn value(&self) -> Value {
        self.value
    }

    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    pub fn volumes(&self) -> &[VolumeId] {
        &self.volumes
    }

    pub fn content(&self) -> &ItemContent {
        &self.content
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.content, ItemContent::Directory { .. })
    }

    /// Can never fit a single volume of `capacity` bytes
    pub fn is_huge(&self, capacity: u64) -> bool {
        self.size > capacity
    }

    pub fn files(&self) -> &[File] {
        match &self.content {
            ItemContent::File { file } => std::slice::from_ref(file),
            ItemContent::Directory { files } => files,
        }
    }

    pub fn files_mut(&mut self) -> &mut [File] {
        match &mut self.content {
            ItemContent::File { file } => std::slice::from_mut(file),
            ItemContent::Directory { files } => files,
        }
    }

    /// Inclusion score given the number of volumes issued so far
    pub fn alpha(&self, total_volumes: usize) -> Result<f64> {
        alpha_scorer::alpha(self.value, self.volumes.len(), total_volumes)
    }

    /// Assign the item digest once; repeating the same value is a no-op
    pub fn set_digest(&mut self, digest: Digest) -> Result<()> {
        match &self.digest {
            None => {
                self.digest = Some(digest);
                Ok(())
            }
            Some(existing) if *existing == digest => Ok(()),
            Some(existing) => Err(Error::PreconditionViolation(format!(
                "Item {} already has digest {}, refusing {}",
                self.id(),
                existing,
                digest
            ))),
        }
    }

    /// Fold member digests into the item digest
    ///
    /// Returns `Ok(false)` while any member digest is unset: a partial
    /// composite is never valid.
    pub fn resolve_digest(&mut self, algorithm: DigestAlgorithm) -> Result<bool> {
        let digest = match &self.content {
            ItemContent::File { file } => match file.digest() {
                Some(d) => d.clone(),
                None => return Ok(false),
            },
            ItemContent::Directory { files } => {
                if files.iter().any(|f| f.digest().is_none()) {
                    return Ok(false);
                }
                content_hasher::composite_digest(algorithm, files)
            }
        };
        self.set_digest(digest)?;
        Ok(true)
    }

    /// Append a volume to the history
    ///
    /// Returns `Ok(false)` if the volume is already recorded. Appending a
    /// volume older than the latest recorded one is rejected.
    pub fn record_volume(&mut self, volume: VolumeId) -> Result<bool> {
        if self.volumes.contains(&volume) {
            return Ok(false);
        }
        if let Some(last) = self.volumes.last() {
            if volume < *last {
                return Err(Error::PreconditionViolation(format!(
                    "Item {} history ends at volume {}, cannot append {}",
                    self.id(),
                    last,
                    volume
                )));
            }
        }
        self.volumes.push(volume);
        Ok(true)
    }

    pub(crate) fn replace_history(&mut self, volumes: Vec<VolumeId>) -> Result<()> {
        if volumes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::PreconditionViolation(format!(
                "Item {} history is not strictly increasing",
                self.id()
            )));
        }
        self.volumes = volumes;
        Ok(())
    }
}

fn item_name(relative_path: &str) -> String {
    relative_path
        .rsplit('/')
        .next()
        .unwrap_or(relative_path)
        .to_string()
}
