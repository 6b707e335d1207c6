//! # jmcollector Common Library
//!
//! Shared code for the jmcollector crates:
//! - Error type and result alias
//! - Configuration loading and root folder resolution

pub mod config;
pub mod error;

pub use config::{CollectionRule, DigestAlgorithm, TomlConfig};
pub use error::{Error, Result};
