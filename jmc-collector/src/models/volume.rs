//! Sealed removable volume

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically increasing volume identifier; the first volume is 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeId(u32);

impl VolumeId {
    pub const FIRST: VolumeId = VolumeId(1);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// A group of items stored on the same removable medium
///
/// Immutable once sealed; sealed volumes are the history future scoring
/// depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    id: VolumeId,
    /// Item ids, in allocation order
    members: Vec<String>,
    /// Total bytes of all members
    size: u64,
    sealed_at: DateTime<Utc>,
}

impl Volume {
    pub(crate) fn seal(id: VolumeId, members: Vec<String>, size: u64) -> Self {
        Self {
            id,
            members,
            size,
            sealed_at: Utc::now(),
        }
    }

    pub fn id(&self) -> VolumeId {
        self.id
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn sealed_at(&self) -> DateTime<Utc> {
        self.sealed_at
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.members.iter().any(|m| m == item_id)
    }
}
