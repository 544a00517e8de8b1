//! Configuration for the fingerprinting pipeline.
//!
//! Every section has sensible defaults, so a partial JSON document only
//! needs to name the values it changes.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formats::pe::ParseOptions;
use crate::io::IOLimits;

/// Master configuration for `fingerprint_bytes` / `fingerprint_file`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// I/O configuration for file access.
    pub io: IOConfig,
    /// Which structural hashes to compute.
    pub hashes: HashConfig,
    /// Limits for the PE structural parsers.
    pub parse: ParseOptions,
}

impl FingerprintConfig {
    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// I/O configuration for file access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IOConfig {
    /// Maximum file size to fingerprint (default: 268435456 = 256MB).
    pub max_file_size: u64,
}

impl Default for IOConfig {
    fn default() -> Self {
        Self {
            max_file_size: IOLimits::default().max_file_size,
        }
    }
}

impl IOConfig {
    pub fn limits(&self) -> IOLimits {
        IOLimits {
            max_file_size: self.max_file_size,
        }
    }
}

/// Toggles for the individual hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    /// ssdeep over the whole file.
    pub ssdeep: bool,
    /// PE import hash.
    pub imphash: bool,
    /// PE resource leaves and version info.
    pub resources: bool,
    /// ELF symhash/telfhash and Mach-O symhash.
    pub symbols: bool,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            ssdeep: true,
            imphash: true,
            resources: true,
            symbols: true,
        }
    }
}
