//! Services: hashing, scoring, allocation, crawling and persistence

pub mod alpha_scorer;
pub mod catalog;
pub mod content_hasher;
pub mod file_scanner;
pub mod hash_runner;
pub mod volume_allocator;

pub use catalog::{Catalog, CatalogDocument};
pub use file_scanner::FileScanner;
pub use hash_runner::{HashFailure, HashReport, HashRunner};
pub use volume_allocator::{AllocationPlan, ScoredItem, SealedAllocation, VolumeAllocator};
