//! Root aggregate of the archive

use super::{Collection, File, Item, Volume, VolumeId};
use jmc_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The main directory of the archive: its collections and the history of
/// sealed volumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collector {
    root: PathBuf,
    collections: Vec<Collection>,
    #[serde(default)]
    volumes: Vec<Volume>,
}

impl Collector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            collections: Vec::new(),
            volumes: Vec::new(),
        }
    }

    /// Add a collection; its directory must not be, contain or sit inside
    /// the directory of another collection, so item ids stay unique
    pub fn add_collection(&mut self, collection: Collection) -> Result<()> {
        if self.collection(collection.name()).is_some() {
            return Err(Error::InvalidInput(format!(
                "Duplicate collection {}",
                collection.name()
            )));
        }
        if let Some(other) = self.collections.iter().find(|c| {
            c.path().starts_with(collection.path()) || collection.path().starts_with(c.path())
        }) {
            return Err(Error::InvalidInput(format!(
                "Collection {} overlaps collection {}",
                collection.name(),
                other.name()
            )));
        }
        self.collections.push(collection);
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name() == name)
    }

    pub fn iter_items(&self) -> impl Iterator<Item = &Item> {
        self.collections.iter().flat_map(|c| c.items().iter())
    }

    pub fn iter_items_mut(&mut self) -> impl Iterator<Item = &mut Item> {
        self.collections
            .iter_mut()
            .flat_map(|c| c.items_mut().iter_mut())
    }

    pub fn iter_files(&self) -> impl Iterator<Item = &File> {
        self.collections.iter().flat_map(|c| c.iter_files())
    }

    pub fn find_item(&self, id: &str) -> Option<&Item> {
        self.iter_items().find(|item| item.id() == id)
    }

    pub fn find_item_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.iter_items_mut().find(|item| item.id() == id)
    }

    /// Absolute location of a file on disk
    pub fn absolute_path(&self, file: &File) -> PathBuf {
        self.root.join(file.path())
    }

    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    /// Number of volumes issued so far
    pub fn total_volumes(&self) -> usize {
        self.volumes.len()
    }

    pub fn next_volume_id(&self) -> VolumeId {
        self.volumes
            .last()
            .map(|v| v.id().next())
            .unwrap_or(VolumeId::FIRST)
    }

    pub(crate) fn push_volume(&mut self, volume: Volume) -> Result<()> {
        if volume.id() != self.next_volume_id() {
            return Err(Error::PreconditionViolation(format!(
                "Volume {} is out of sequence, expected {}",
                volume.id(),
                self.next_volume_id()
            )));
        }
        self.volumes.push(volume);
        Ok(())
    }

    /// Check that volume ids run 1, 2, 3... in order
    pub fn validate_volumes(&self) -> Result<()> {
        let mut expected = VolumeId::FIRST;
        for volume in &self.volumes {
            if volume.id() != expected {
                return Err(Error::PreconditionViolation(format!(
                    "Volume {} is out of sequence, expected {}",
                    volume.id(),
                    expected
                )));
            }
            expected = expected.next();
        }
        Ok(())
    }

    /// Check the volume sequence, that no item history is longer than the
    /// volume count and that every history entry names a sealed volume
    pub fn validate_history(&self) -> Result<()> {
        self.validate_volumes()?;
        let total = self.total_volumes();
        let known: HashSet<VolumeId> = self.volumes.iter().map(Volume::id).collect();
        for item in self.iter_items() {
            if item.volumes().len() > total {
                return Err(Error::PreconditionViolation(format!(
                    "Item {} is in {} volumes but only {} were issued",
                    item.id(),
                    item.volumes().len(),
                    total
                )));
            }
            if let Some(unknown) = item.volumes().iter().find(|v| !known.contains(v)) {
                return Err(Error::PreconditionViolation(format!(
                    "Item {} references unknown volume {}",
                    item.id(),
                    unknown
                )));
            }
        }
        Ok(())
    }

    /// Carry volume history over from a previously saved collector
    ///
    /// Used after a fresh crawl: the sealed volume list is copied and each
    /// item gets the history its id had before. History entries naming a
    /// volume the previous collector does not know are dropped. Returns the
    /// number of items whose history was restored.
    pub fn restore_history(&mut self, previous: &Collector) -> Result<usize> {
        if !self.volumes.is_empty() {
            return Err(Error::PreconditionViolation(
                "History can only be restored into a collector without volumes".to_string(),
            ));
        }
        previous.validate_volumes()?;

        let known: HashSet<VolumeId> = previous.volumes.iter().map(Volume::id).collect();
        let histories: HashMap<String, &[VolumeId]> = previous
            .iter_items()
            .map(|item| (item.id(), item.volumes()))
            .collect();

        let mut restored = 0;
        for item in self.iter_items_mut() {
            let id = item.id();
            let Some(history) = histories.get(&id) else {
                continue;
            };
            let kept: Vec<VolumeId> = history
                .iter()
                .copied()
                .filter(|v| known.contains(v))
                .collect();
            if kept.len() != history.len() {
                warn!(
                    item = %id,
                    dropped = history.len() - kept.len(),
                    "Dropping history entries for unknown volumes"
                );
            }
            if !kept.is_empty() {
                restored += 1;
            }
            item.replace_history(kept)?;
        }

        self.volumes = previous.volumes.clone();
        debug!(
            restored,
            volumes = self.volumes.len(),
            "Restored volume history"
        );
        self.validate_history()?;
        Ok(restored)
    }
}
