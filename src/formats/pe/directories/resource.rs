//! Resource directory walking
//!
//! The resource tree is adversarial input: every offset is checked against
//! the section buffer and recursion is capped at the three levels the format
//! defines (type, name, language).

use std::cell::Cell;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::formats::pe::types::*;
use crate::formats::pe::utils::{read_utf16le, rva_to_offset, slice_at, u16_at, u32_at};
use crate::hashing::sha256_digest;

/// Label used when a leaf's content type cannot be identified
pub const DEFAULT_MIME: &str = "Data";

/// Deepest directory level; its entries must be data leaves
const LANGUAGE_LEVEL: u8 = 2;

static RESOURCE_TYPE_NAMES: Lazy<HashMap<u32, &'static str>> = Lazy::new(|| {
    [
        (1, "RT_CURSOR"),
        (2, "RT_BITMAP"),
        (3, "RT_ICON"),
        (4, "RT_MENU"),
        (5, "RT_DIALOG"),
        (6, "RT_STRING"),
        (7, "RT_FONTDIR"),
        (8, "RT_FONT"),
        (9, "RT_ACCELERATOR"),
        (10, "RT_RCDATA"),
        (11, "RT_MESSAGETABLE"),
        (12, "RT_GROUP_CURSOR"),
        (14, "RT_GROUP_ICON"),
        (16, "RT_VERSION"),
        (17, "RT_DLGINCLUDE"),
        (19, "RT_PLUGPLAY"),
        (20, "RT_VXD"),
        (21, "RT_ANICURSOR"),
        (22, "RT_ANIICON"),
        (23, "RT_HTML"),
        (24, "RT_MANIFEST"),
    ]
    .into_iter()
    .collect()
});

/// Symbolic name of a numeric resource type, or its decimal rendering.
pub fn resource_type_name(id: u32) -> String {
    RESOURCE_TYPE_NAMES
        .get(&id)
        .map(|name| (*name).to_string())
        .unwrap_or_else(|| id.to_string())
}

/// A data leaf of the resource tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLeaf {
    #[serde(rename = "type")]
    pub type_label: String,
    pub language: u16,
    pub sha256: String,
    pub mime: String,
    pub size: usize,
    /// Raw leaf bytes; only kept for the version-info pass
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Walk the resource tree of a `.rsrc` section and collect its leaves in
/// directory order.
pub fn walk_resources(
    section: &ResourceSection<'_>,
    options: &ParseOptions,
) -> Result<Vec<ResourceLeaf>> {
    let walker = ResourceWalker {
        section,
        options,
        entries: Cell::new(0),
    };
    let mut leaves = Vec::new();
    walker.walk_directory(0, 0, None, &mut leaves)?;
    debug!(
        leaves = leaves.len(),
        entries = walker.entries.get(),
        "Walked resource directory"
    );
    Ok(leaves)
}

struct ResourceWalker<'s, 'a> {
    section: &'s ResourceSection<'a>,
    options: &'s ParseOptions,
    /// Directory entries visited so far
    entries: Cell<usize>,
}

impl ResourceWalker<'_, '_> {
    fn walk_directory(
        &self,
        offset: usize,
        level: u8,
        type_label: Option<&str>,
        leaves: &mut Vec<ResourceLeaf>,
    ) -> Result<()> {
        let data = self.section.data;
        slice_at(data, offset, RESOURCE_DIRECTORY_SIZE)?;
        let named = u16_at(data, offset + 12)? as usize;
        let ids = u16_at(data, offset + 14)? as usize;
        let count = named + ids;

        let entries_offset = offset + RESOURCE_DIRECTORY_SIZE;
        // Reject over-declared headers before touching any entry
        slice_at(data, entries_offset, count * RESOURCE_ENTRY_SIZE)?;
        let visited = self.entries.get() + count;
        if visited > self.options.max_resource_entries {
            return Err(PeError::LimitExceeded("resource directory entries"));
        }
        self.entries.set(visited);
        trace!(offset, level, count, "Resource directory");

        for index in 0..count {
            let entry = entries_offset + index * RESOURCE_ENTRY_SIZE;
            let selector = u32_at(data, entry)?;
            let target = u32_at(data, entry + 4)?;

            let resolved;
            let label = match type_label {
                Some(label) => label,
                None => {
                    resolved = self.entry_name(selector)?;
                    resolved.as_str()
                }
            };

            if target & RESOURCE_HIGH_BIT != 0 {
                if level >= LANGUAGE_LEVEL {
                    return Err(PeError::ResourceDepthExceeded);
                }
                let child = (target & !RESOURCE_HIGH_BIT) as usize;
                self.walk_directory(child, level + 1, Some(label), leaves)?;
            } else {
                if level != LANGUAGE_LEVEL {
                    return Err(PeError::MalformedResourceDirectory(
                        "data entry above the language level",
                    ));
                }
                if leaves.len() >= self.options.max_resources {
                    return Err(PeError::LimitExceeded("resource leaves"));
                }
                let language = (selector & 0xFFFF) as u16;
                leaves.push(self.read_leaf(target as usize, label, language)?);
            }
        }
        Ok(())
    }

    /// Resolve a type selector: a length-prefixed UTF-16 name or a numeric id.
    fn entry_name(&self, selector: u32) -> Result<String> {
        if selector & RESOURCE_HIGH_BIT == 0 {
            return Ok(resource_type_name(selector));
        }
        let data = self.section.data;
        let offset = (selector & !RESOURCE_HIGH_BIT) as usize;
        let units = u16_at(data, offset)? as usize;
        let name = slice_at(data, offset + 2, units * 2)?;
        Ok(read_utf16le(name))
    }

    fn read_leaf(&self, offset: usize, type_label: &str, language: u16) -> Result<ResourceLeaf> {
        let data = self.section.data;
        slice_at(data, offset, RESOURCE_DATA_ENTRY_SIZE)?;
        let data_rva = u32_at(data, offset)?;
        let size = u32_at(data, offset + 4)? as usize;

        let local = rva_to_offset(data_rva, self.section.virtual_address)?;
        let bytes = slice_at(data, local, size)?;

        let mime = if self.options.sniff_resource_mime {
            infer::get(bytes)
                .map(|kind| kind.mime_type().to_string())
                .unwrap_or_else(|| DEFAULT_MIME.to_string())
        } else {
            DEFAULT_MIME.to_string()
        };

        Ok(ResourceLeaf {
            type_label: type_label.to_string(),
            language,
            sha256: sha256_digest(bytes),
            mime,
            size,
            data: bytes.to_vec(),
        })
    }
}
