//! Configuration loading and root folder resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (`JMC_ROOT_FOLDER`, `JMC_CONFIG`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! A missing TOML file is not an error: defaults are used and a warning is logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the collector root folder
pub const ROOT_FOLDER_ENV: &str = "JMC_ROOT_FOLDER";

/// Environment variable overriding the configuration file path
pub const CONFIG_PATH_ENV: &str = "JMC_CONFIG";

/// Default capacity of one removable volume (a single-layer DVD, with margin)
pub const DEFAULT_VOLUME_CAPACITY: u64 = 4300 * 1024 * 1024;

/// Catalog location relative to the collector root
pub const DEFAULT_CATALOG_RELATIVE_PATH: &str = ".jminfo/catalog.json";

/// Content digest algorithm
///
/// Both variants are deterministic; `Sha1` (160-bit) is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Width of the lower-case hex encoding of a digest
    pub fn hex_len(self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 40,
            DigestAlgorithm::Sha256 => 64,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(DigestAlgorithm::Sha1),
            "sha256" => Ok(DigestAlgorithm::Sha256),
            other => Err(Error::Config(format!("Unknown digest algorithm: {}", other))),
        }
    }
}

/// How a collection directory is turned into items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionRule {
    /// Every file below the collection directory is one item
    Files,
    /// Every immediate subdirectory is one item
    Directories,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_volume_capacity() -> u64 {
    DEFAULT_VOLUME_CAPACITY
}

/// Configuration loaded from the TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Collector root folder
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Catalog file (defaults to `<root>/.jminfo/catalog.json`)
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Volume capacity bound in bytes
    #[serde(default = "default_volume_capacity")]
    pub volume_capacity: u64,

    /// Digest algorithm used for content identity
    #[serde(default)]
    pub digest_algorithm: DigestAlgorithm,

    /// Hash worker count (defaults to available parallelism)
    #[serde(default)]
    pub hash_workers: Option<usize>,

    /// Collection directories (relative to the root) and their rule
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionRule>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            catalog_path: None,
            volume_capacity: DEFAULT_VOLUME_CAPACITY,
            digest_algorithm: DigestAlgorithm::default(),
            hash_workers: None,
            collections: BTreeMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match resolve_config_path(None) {
                Some(p) => p,
                None => {
                    warn!("No configuration file location available, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            warn!(path = %path.display(), "Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let config = Self::load(&path)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Reject settings the allocator cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.volume_capacity == 0 {
            return Err(Error::Config("volume_capacity must be greater than zero".to_string()));
        }
        if self.hash_workers == Some(0) {
            return Err(Error::Config("hash_workers must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Catalog location for the given collector root
    pub fn catalog_path_for(&self, root_folder: &Path) -> PathBuf {
        match &self.catalog_path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root_folder.join(p),
            None => root_folder.join(DEFAULT_CATALOG_RELATIVE_PATH),
        }
    }
}

/// Locate the configuration file: CLI argument, then `JMC_CONFIG`, then
/// `~/.config/jmcollector/config.toml`
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|d| d.join("jmcollector").join("config.toml"))
}

/// Root folder resolution
///
/// Priority: command-line argument → `JMC_ROOT_FOLDER` → TOML `root_folder`
/// → OS-dependent default.
pub struct RootFolderResolver<'a> {
    cli_arg: Option<&'a Path>,
    config: Option<&'a TomlConfig>,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new() -> Self {
        Self {
            cli_arg: None,
            config: None,
        }
    }

    pub fn with_cli_arg(mut self, cli_arg: Option<&'a Path>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    pub fn with_config(mut self, config: &'a TomlConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = self.cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = self.config.and_then(|c| c.root_folder.clone()) {
            return path;
        }

        default_root_folder()
    }
}

impl Default for RootFolderResolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// OS-dependent default collector root (`~/Archive`)
pub fn default_root_folder() -> PathBuf {
    dirs::home_dir()
        .map(|d| d.join("Archive"))
        .unwrap_or_else(|| PathBuf::from("./archive"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.volume_capacity, 4300 * 1024 * 1024);
        assert_eq!(config.digest_algorithm, DigestAlgorithm::Sha1);
        assert_eq!(config.logging.level, "info");
        assert!(config.collections.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config: TomlConfig = toml::from_str(
            r#"
            root_folder = "/data/archive"
            volume_capacity = 1000
            digest_algorithm = "sha256"
            hash_workers = 4

            [collections]
            "musica" = "directories"
            "documentos" = "files"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.root_folder, Some(PathBuf::from("/data/archive")));
        assert_eq!(config.volume_capacity, 1000);
        assert_eq!(config.digest_algorithm, DigestAlgorithm::Sha256);
        assert_eq!(config.hash_workers, Some(4));
        assert_eq!(config.collections["musica"], CollectionRule::Directories);
        assert_eq!(config.collections["documentos"], CollectionRule::Files);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = TomlConfig {
            volume_capacity: 0,
            ..TomlConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_catalog_path_for() {
        let root = Path::new("/data/archive");
        let mut config = TomlConfig::default();
        assert_eq!(
            config.catalog_path_for(root),
            PathBuf::from("/data/archive/.jminfo/catalog.json")
        );

        config.catalog_path = Some(PathBuf::from("meta/catalog.json"));
        assert_eq!(
            config.catalog_path_for(root),
            PathBuf::from("/data/archive/meta/catalog.json")
        );

        config.catalog_path = Some(PathBuf::from("/elsewhere/catalog.json"));
        assert_eq!(
            config.catalog_path_for(root),
            PathBuf::from("/elsewhere/catalog.json")
        );
    }

    #[test]
    fn test_digest_algorithm_from_str() {
        assert_eq!("SHA1".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha1);
        assert_eq!("sha256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert!("md5".parse::<DigestAlgorithm>().is_err());
    }
}
