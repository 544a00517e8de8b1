//! Error types for the binprint fingerprinting engine.
//!
//! Format-level failures live in [`crate::formats::pe::PeError`] and
//! [`crate::io::error::IoError`]; this module provides the crate-wide error
//! that wraps them, plus the per-component error record used by the
//! fingerprint aggregate.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::formats::pe::PeError;
use crate::io::error::IoError;

/// Main error type for binprint operations.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// Structural PE parsing failure (imports, resources, adapters)
    #[error(transparent)]
    Pe(#[from] PeError),

    /// Bounded file access failure
    #[error(transparent)]
    Io(#[from] IoError),

    /// Raw stream failure while re-reading a byte source
    #[error("I/O error: {0}")]
    Stream(#[from] std::io::Error),

    /// The fuzzy hash block size dropped under the algorithm minimum
    #[error("Fuzzy hash block size {block_size} is below the minimum of {minimum}")]
    BlockSizeTooSmall { block_size: u64, minimum: u64 },

    /// Binary format not understood by an adapter
    #[error("Invalid binary format: {0}")]
    InvalidFormat(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for binprint operations
pub type Result<T> = std::result::Result<T, FingerprintError>;

impl From<serde_json::Error> for FingerprintError {
    fn from(err: serde_json::Error) -> Self {
        FingerprintError::Serialization(err.to_string())
    }
}

impl From<object::read::Error> for FingerprintError {
    fn from(err: object::read::Error) -> Self {
        FingerprintError::InvalidFormat(err.to_string())
    }
}

/// Sub-computation of a fingerprint that can fail independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashComponent {
    Ssdeep,
    Imphash,
    Resources,
    Symhash,
    Telfhash,
    Container,
}

impl fmt::Display for HashComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashComponent::Ssdeep => write!(f, "ssdeep"),
            HashComponent::Imphash => write!(f, "imphash"),
            HashComponent::Resources => write!(f, "resources"),
            HashComponent::Symhash => write!(f, "symhash"),
            HashComponent::Telfhash => write!(f, "telfhash"),
            HashComponent::Container => write!(f, "container"),
        }
    }
}

/// A recorded failure of one hash sub-computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashError {
    pub component: HashComponent,
    pub message: String,
}

impl HashError {
    pub fn new(component: HashComponent, err: impl fmt::Display) -> Self {
        Self {
            component,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.message)
    }
}
