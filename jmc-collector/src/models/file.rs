//! Leaf content unit

use super::Digest;
use jmc_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// A file controlled by the collector
///
/// Identity is `(path, digest)`. The digest is unset until computed and
/// can be assigned exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Path relative to the collector root
    path: PathBuf,
    /// Path relative to the owning item, always `/`-separated
    relative_path: String,
    /// Size in bytes
    size: u64,
    #[serde(default)]
    digest: Option<Digest>,
}

impl File {
    pub fn new(path: impl Into<PathBuf>, relative_path: impl AsRef<Path>, size: u64) -> Self {
        Self {
            path: path.into(),
            relative_path: slash_path(relative_path.as_ref()),
            size,
            digest: None,
        }
    }

    /// Build a file whose digest is already known (e.g. restored from a catalog)
    pub fn with_digest(mut self, digest: Digest) -> Self {
        self.digest = Some(digest);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    /// Assign the digest
    ///
    /// Assigning the same value again is a no-op; a different value means the
    /// content changed under us and is rejected.
    pub fn set_digest(&mut self, digest: Digest) -> Result<()> {
        match &self.digest {
            None => {
                self.digest = Some(digest);
                Ok(())
            }
            Some(existing) if *existing == digest => Ok(()),
            Some(existing) => Err(Error::PreconditionViolation(format!(
                "File {} already has digest {}, refusing {}",
                self.path.display(),
                existing,
                digest
            ))),
        }
    }

    /// Line of the composite digest table: `"<digest> <relative_path>"`,
    /// or the bare relative path while the digest is unset
    pub fn table_line(&self) -> String {
        match &self.digest {
            Some(digest) => format!("{} {}", digest, self.relative_path),
            None => self.relative_path.clone(),
        }
    }
}

/// Render a relative path with `/` separators regardless of platform
///
/// This is the only representation used in digest tables and catalogs.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
