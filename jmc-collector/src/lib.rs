//! jmc-collector library interface
//!
//! Organizes an archive into content-addressed items and decides which
//! items go on the next size-bounded backup volume.

pub mod models;
pub mod services;

pub use crate::models::{Collection, Collector, Digest, File, Item, Value, Volume, VolumeId};
pub use crate::services::{
    AllocationPlan, Catalog, FileScanner, HashReport, HashRunner, SealedAllocation,
    VolumeAllocator,
};
