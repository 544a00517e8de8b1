//! Section summaries for PE files

use serde::{Deserialize, Serialize};

use crate::entropy::rounded_entropy;
use crate::hashing::md5_digest;

/// Name of the first section UPX writes
const UPX_SECTION: &str = "UPX0";

/// Per-section identity: placement, sizes, entropy and MD5 of the raw bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub name: String,
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub raw_size: u32,
    pub entropy: f64,
    pub md5: String,
}

impl SectionSummary {
    pub fn new(
        raw_name: &[u8],
        virtual_address: u32,
        virtual_size: u32,
        raw_size: u32,
        data: &[u8],
    ) -> Self {
        Self {
            name: String::from_utf8_lossy(raw_name).into_owned(),
            virtual_address,
            virtual_size,
            raw_size,
            entropy: rounded_entropy(data),
            md5: md5_digest(data),
        }
    }

    /// True when `rva` falls inside the section's virtual extent.
    pub fn contains_rva(&self, rva: u32) -> bool {
        rva >= self.virtual_address
            && (rva as u64) < self.virtual_address as u64 + self.virtual_size as u64
    }
}

/// Packer name recognizable from section names alone.
pub fn detect_packer(sections: &[SectionSummary]) -> Option<String> {
    sections
        .iter()
        .any(|s| s.name == UPX_SECTION)
        .then(|| "upx".to_string())
}
