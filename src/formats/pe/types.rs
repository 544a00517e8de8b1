//! Core PE data types shared by the import and resource parsers

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Data directory indices
pub const IMAGE_DIRECTORY_ENTRY_IMPORT: usize = 1;
pub const IMAGE_DIRECTORY_ENTRY_RESOURCE: usize = 2;

/// Size of one IMAGE_IMPORT_DESCRIPTOR record
pub const IMPORT_DESCRIPTOR_SIZE: usize = 20;
/// Size of an IMAGE_RESOURCE_DIRECTORY header
pub const RESOURCE_DIRECTORY_SIZE: usize = 16;
/// Size of an IMAGE_RESOURCE_DIRECTORY_ENTRY
pub const RESOURCE_ENTRY_SIZE: usize = 8;
/// Size of an IMAGE_RESOURCE_DATA_ENTRY
pub const RESOURCE_DATA_ENTRY_SIZE: usize = 16;

/// High bit flagging a subdirectory or a named resource entry
pub const RESOURCE_HIGH_BIT: u32 = 0x8000_0000;

/// PE parsing error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeError {
    #[error("Invalid RVA: 0x{rva:08x}")]
    InvalidRva { rva: u32 },
    #[error("Invalid offset: 0x{offset:x}")]
    InvalidOffset { offset: usize },
    #[error("Truncated structure at 0x{offset:x}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("Invalid string at offset 0x{offset:x}")]
    InvalidString { offset: usize },
    #[error("Malformed resource directory: {0}")]
    MalformedResourceDirectory(&'static str),
    #[error("Resource directory depth exceeded")]
    ResourceDepthExceeded,
    #[error("Limit exceeded: {0}")]
    LimitExceeded(&'static str),
    #[error("Container parse error: {0}")]
    Object(String),
}

impl From<object::read::Error> for PeError {
    fn from(err: object::read::Error) -> Self {
        PeError::Object(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PeError>;

/// Parsing limits and switches for the structural PE parsers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Maximum number of import entries accepted before failing
    pub max_imports: usize,
    /// Maximum number of resource leaves accepted before failing
    pub max_resources: usize,
    /// Maximum number of resource directory entries visited, counted per
    /// visit so shared subtrees are charged every time they are reached
    pub max_resource_entries: usize,
    /// Run a content sniff over each resource leaf
    pub sniff_resource_mime: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_imports: 10_000,
            max_resources: 10_000,
            max_resource_entries: 100_000,
            sniff_resource_mime: true,
        }
    }
}

/// Raw bytes of the section holding the import directory, with the
/// addresses needed to translate RVAs into section offsets.
#[derive(Debug, Clone, Copy)]
pub struct ImportDirectory<'a> {
    pub section_data: &'a [u8],
    pub directory_rva: u32,
    pub section_rva: u32,
    pub is_64bit: bool,
}

/// Raw bytes of the `.rsrc` section and its virtual address.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSection<'a> {
    pub data: &'a [u8],
    pub virtual_address: u32,
}
