//! Data models for the collector
//!
//! File → Item → Collection → Collector, plus the sealed Volume record.

pub mod collection;
pub mod collector;
pub mod digest;
pub mod file;
pub mod item;
pub mod volume;

pub use collection::Collection;
pub use collector::Collector;
pub use digest::Digest;
pub use file::{slash_path, File};
pub use item::{Item, ItemContent, Value};
pub use volume::{Volume, VolumeId};
