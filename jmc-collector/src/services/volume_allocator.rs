//! Next-volume selection
//!
//! **Algorithm:**
//! 1. Items larger than the capacity are set aside as huge (manual handling)
//! 2. Every other item is scored with its alpha, using the number of volumes
//!    issued so far
//! 3. Items are sorted by alpha descending; ties go to the higher value, then
//!    to the lexicographically smaller item id
//! 4. Items are taken in that order while they fit the remaining capacity;
//!    an item that does not fit is deferred and the scan continues
//!
//! There is no backtracking or exact bin-packing. Fairness across runs comes
//! from the scores: deferred items score higher next time.

use crate::models::{Collector, Item, Value, Volume, VolumeId};
use jmc_common::{Error, Result};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// An item considered for the next volume, with its score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    pub id: String,
    pub size: u64,
    pub value: Value,
    pub alpha: f64,
}

/// Outcome of scoring and packing, before anything is sealed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationPlan {
    /// Id the volume gets when sealed
    pub volume_id: VolumeId,
    pub capacity: u64,
    /// Selected items, in allocation order
    pub members: Vec<ScoredItem>,
    /// Items larger than the capacity
    pub skipped_huge: Vec<String>,
    /// Items that fit the capacity but not the space left
    pub deferred: Vec<ScoredItem>,
    /// Items left out because their digest is not resolved
    pub unresolved: Vec<String>,
    pub used_bytes: u64,
}

impl AllocationPlan {
    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }

    pub fn free_bytes(&self) -> u64 {
        self.capacity - self.used_bytes
    }
}

/// Result of a sealed allocation run
#[derive(Debug, Clone)]
pub struct SealedAllocation {
    pub volume: Volume,
    pub skipped_huge: Vec<String>,
    pub deferred: Vec<String>,
    pub unresolved: Vec<String>,
}

/// Selects the members of the next volume under a capacity bound
#[derive(Debug, Clone)]
pub struct VolumeAllocator {
    capacity: u64,
    require_digest: bool,
}

impl VolumeAllocator {
    /// A zero capacity is a configuration error
    pub fn new(capacity: u64) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::PreconditionViolation(
                "Volume capacity must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            require_digest: true,
        })
    }

    /// Whether items without a resolved digest are left out (default true)
    pub fn require_digest(mut self, require: bool) -> Self {
        self.require_digest = require;
        self
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Score and pack `items` for the volume after `total_volumes` issued ones
    ///
    /// Pure: nothing is mutated. An empty candidate set yields an empty plan.
    pub fn plan<'a, I>(&self, items: I, total_volumes: usize) -> Result<AllocationPlan>
    where
        I: IntoIterator<Item = &'a Item>,
    {
        let mut fits = Vec::new();
        let mut skipped_huge = Vec::new();
        let mut unresolved = Vec::new();

        for item in items {
            if item.is_huge(self.capacity) {
                skipped_huge.push(item.id());
                continue;
            }
            if self.require_digest && item.digest().is_none() {
                unresolved.push(item.id());
                continue;
            }
            let alpha = item.alpha(total_volumes).map_err(|e| match e {
                Error::PreconditionViolation(msg) => {
                    Error::PreconditionViolation(format!("{}: {}", item.id(), msg))
                }
                other => other,
            })?;
            fits.push(ScoredItem {
                id: item.id(),
                size: item.size(),
                value: item.value(),
                alpha,
            });
        }

        fits.sort_by(compare_scored);

        let mut members = Vec::new();
        let mut deferred = Vec::new();
        let mut used_bytes = 0u64;
        for candidate in fits {
            match used_bytes.checked_add(candidate.size) {
                Some(total) if total <= self.capacity => {
                    used_bytes = total;
                    members.push(candidate);
                }
                _ => deferred.push(candidate),
            }
        }

        let volume_id = u32::try_from(total_volumes)
            .ok()
            .and_then(|n| n.checked_add(1))
            .map(VolumeId::new)
            .ok_or_else(|| {
                Error::PreconditionViolation(format!(
                    "Volume count {} exceeds the volume id range",
                    total_volumes
                ))
            })?;
        debug!(
            volume = %volume_id,
            members = members.len(),
            deferred = deferred.len(),
            huge = skipped_huge.len(),
            unresolved = unresolved.len(),
            used_bytes,
            capacity = self.capacity,
            "Allocation planned"
        );

        Ok(AllocationPlan {
            volume_id,
            capacity: self.capacity,
            members,
            skipped_huge,
            deferred,
            unresolved,
            used_bytes,
        })
    }

    /// Plan over every item of `collector` and seal the resulting volume
    pub fn allocate_next_volume(&self, collector: &mut Collector) -> Result<SealedAllocation> {
        collector.validate_history()?;
        let plan = self.plan(collector.iter_items(), collector.total_volumes())?;
        seal(collector, &plan)?;

        let volume = collector
            .volumes()
            .last()
            .cloned()
            .ok_or_else(|| Error::Internal("Sealed volume missing".to_string()))?;

        for id in &plan.skipped_huge {
            warn!(item = %id, capacity = self.capacity, "Item exceeds volume capacity, needs manual handling");
        }
        info!(
            volume = %volume.id(),
            members = volume.members().len(),
            size = volume.size(),
            "Volume sealed"
        );

        Ok(SealedAllocation {
            volume,
            skipped_huge: plan.skipped_huge,
            deferred: plan.deferred.into_iter().map(|d| d.id).collect(),
            unresolved: plan.unresolved,
        })
    }
}

/// Record `plan` as the next volume of `collector`
///
/// Every member's history gains the volume id exactly once. The plan must
/// have been made against the collector's current volume count; all member
/// ids are checked before anything is mutated.
pub fn seal(collector: &mut Collector, plan: &AllocationPlan) -> Result<()> {
    if plan.volume_id != collector.next_volume_id() {
        return Err(Error::PreconditionViolation(format!(
            "Plan targets volume {} but the next volume is {}",
            plan.volume_id,
            collector.next_volume_id()
        )));
    }
    if plan.used_bytes > plan.capacity {
        return Err(Error::PreconditionViolation(format!(
            "Plan uses {} bytes of a {} byte volume",
            plan.used_bytes, plan.capacity
        )));
    }
    if let Some(missing) = plan
        .members
        .iter()
        .find(|m| collector.find_item(&m.id).is_none())
    {
        return Err(Error::NotFound(format!("Item {}", missing.id)));
    }

    for member in &plan.members {
        if let Some(item) = collector.find_item_mut(&member.id) {
            if !item.record_volume(plan.volume_id)? {
                warn!(item = %member.id, volume = %plan.volume_id, "Volume already in item history");
            }
        }
    }

    collector.push_volume(Volume::seal(
        plan.volume_id,
        plan.member_ids(),
        plan.used_bytes,
    ))
}

/// Alpha descending, then value descending, then id ascending
fn compare_scored(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.alpha
        .total_cmp(&a.alpha)
        .then_with(|| b.value.cmp(&a.value))
        .then_with(|| a.id.cmp(&b.id))
}
