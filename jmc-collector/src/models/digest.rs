//! Content digest value

use jmc_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower-case hex fingerprint of byte content
///
/// 40 characters for SHA-1, 64 for SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Parse a hex digest, normalizing to lower case
    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.trim().to_ascii_lowercase();
        if hex.len() != 40 && hex.len() != 64 {
            return Err(Error::InvalidInput(format!(
                "Digest must be 40 or 64 hex characters, got {}",
                hex.len()
            )));
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidInput(format!("Digest is not hex: {}", hex)));
        }
        Ok(Self(hex))
    }

    /// Wrap hasher output that is already lower-case hex
    pub(crate) fn from_hasher_output(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Digest {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Digest::from_hex(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}
