//! Catalog persistence
//!
//! The catalog is a JSON document holding the whole collector: items, file
//! digests, volume histories and sealed volumes. It is written atomically
//! (temp file + rename) so an interrupted run never leaves a truncated
//! catalog behind.

use crate::models::Collector;
use chrono::{DateTime, Utc};
use jmc_common::{DigestAlgorithm, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Catalog format version written by this build
pub const CATALOG_FORMAT_VERSION: u32 = 1;

/// On-disk catalog document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub format_version: u32,
    /// Algorithm the stored digests were computed with
    pub digest_algorithm: DigestAlgorithm,
    pub saved_at: DateTime<Utc>,
    pub collector: Collector,
}

#[derive(Serialize)]
struct CatalogDocumentRef<'a> {
    format_version: u32,
    digest_algorithm: DigestAlgorithm,
    saved_at: DateTime<Utc>,
    collector: &'a Collector,
}

/// Catalog file handle
pub struct Catalog {
    path: PathBuf,
}

impl Catalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the catalog; a missing file is [`Error::NotFound`]
    ///
    /// History entries naming unknown volumes are left in place for
    /// [`Collector::restore_history`] to drop.
    pub fn load(&self) -> Result<CatalogDocument> {
        if !self.exists() {
            return Err(Error::NotFound(format!("Catalog {}", self.path.display())));
        }
        let content = std::fs::read_to_string(&self.path)?;
        let document: CatalogDocument = serde_json::from_str(&content)?;
        if document.format_version != CATALOG_FORMAT_VERSION {
            return Err(Error::InvalidInput(format!(
                "Catalog {} has format version {}, expected {}",
                self.path.display(),
                document.format_version,
                CATALOG_FORMAT_VERSION
            )));
        }
        document.collector.validate_volumes()?;

        debug!(
            path = %self.path.display(),
            volumes = document.collector.total_volumes(),
            "Catalog loaded"
        );
        Ok(document)
    }

    /// Read the catalog if there is one
    pub fn load_if_exists(&self) -> Result<Option<CatalogDocument>> {
        if self.exists() {
            self.load().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Write the collector atomically
    pub fn save(&self, collector: &Collector, digest_algorithm: DigestAlgorithm) -> Result<()> {
        let document = CatalogDocumentRef {
            format_version: CATALOG_FORMAT_VERSION,
            digest_algorithm,
            saved_at: Utc::now(),
            collector,
        };
        let json = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, &self.path)?;

        info!(
            path = %self.path.display(),
            items = collector.iter_items().count(),
            volumes = collector.total_volumes(),
            "Catalog saved"
        );
        Ok(())
    }
}
