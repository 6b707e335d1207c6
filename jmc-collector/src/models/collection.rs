//! Group of items sharing a construction rule

use super::{File, Item};
use jmc_common::{CollectionRule, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A directory of the collector holding items of one kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    name: String,
    rule: CollectionRule,
    /// Path relative to the collector root
    path: PathBuf,
    items: Vec<Item>,
}

impl Collection {
    pub fn new(name: &str, rule: CollectionRule) -> Self {
        Self {
            name: name.to_string(),
            rule,
            path: PathBuf::from(name),
            items: Vec::new(),
        }
    }

    /// Add an item built for this collection
    ///
    /// The item must name this collection, match its rule and not repeat an
    /// existing item path.
    pub fn add_item(&mut self, item: Item) -> Result<()> {
        if item.collection() != self.name {
            return Err(Error::InvalidInput(format!(
                "Item {} belongs to collection {}, not {}",
                item.id(),
                item.collection(),
                self.name
            )));
        }
        let expects_directory = self.rule == CollectionRule::Directories;
        if item.is_directory() != expects_directory {
            return Err(Error::InvalidInput(format!(
                "Item {} does not match the {:?} rule of collection {}",
                item.id(),
                self.rule,
                self.name
            )));
        }
        if self
            .items
            .iter()
            .any(|i| i.relative_path() == item.relative_path())
        {
            return Err(Error::InvalidInput(format!("Duplicate item {}", item.id())));
        }
        self.items.push(item);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self) -> CollectionRule {
        self.rule
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [Item] {
        &mut self.items
    }

    pub fn iter_files(&self) -> impl Iterator<Item = &File> {
        self.items.iter().flat_map(|item| item.files().iter())
    }

    pub fn total_size(&self) -> u64 {
        self.items.iter().map(Item::size).sum()
    }
}
