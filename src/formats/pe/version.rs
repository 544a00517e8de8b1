//! `StringFileInfo` extraction from the `RT_VERSION` resource

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::formats::pe::directories::resource::ResourceLeaf;
use crate::formats::pe::utils::{align4, read_utf16le, utf16le_units, ReadExt};

/// "StringFileInfo" as UTF-16LE, without the terminator
const STRING_FILE_INFO: &[u8] = &[
    b'S', 0, b't', 0, b'r', 0, b'i', 0, b'n', 0, b'g', 0, b'F', 0, b'i', 0, b'l', 0, b'e', 0,
    b'I', 0, b'n', 0, b'f', 0, b'o', 0,
];

/// wLength, wValueLength, wType
const BLOCK_HEADER_SIZE: usize = 6;
/// Header plus the 8-digit hex language key and its terminator
const STRING_TABLE_CHILDREN: usize = 24;
/// Value type of text entries
const TEXT_VALUE: u16 = 1;

/// One `StringFileInfo` key/value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub name: String,
    pub value: String,
}

impl VersionEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Version strings of the first `RT_VERSION` leaf; empty if there is none.
pub fn version_info(leaves: &[ResourceLeaf]) -> Vec<VersionEntry> {
    leaves
        .iter()
        .find(|leaf| leaf.type_label == "RT_VERSION")
        .map(|leaf| parse_string_file_info(&leaf.data))
        .unwrap_or_default()
}

/// Parse the string tables following the `StringFileInfo` marker.
pub fn parse_string_file_info(data: &[u8]) -> Vec<VersionEntry> {
    let Some(marker) = memchr::memmem::find(data, STRING_FILE_INFO) else {
        return Vec::new();
    };

    // Bound the walk by the StringFileInfo block itself when its header is
    // readable, so a trailing VarFileInfo is not read as a string table.
    let key_end = marker + STRING_FILE_INFO.len() + 2;
    let (start, end) = match marker.checked_sub(BLOCK_HEADER_SIZE) {
        Some(block) => {
            let length = data.read_u16_le_at(block).unwrap_or(0) as usize;
            let end = if length > key_end - block {
                (block + length).min(data.len())
            } else {
                data.len()
            };
            (block + align4(key_end - block), end)
        }
        None => (align4(key_end), data.len()),
    };

    let entries = match data.get(start..end) {
        Some(tables) => read_string_tables(tables),
        None => Vec::new(),
    };
    debug!(entries = entries.len(), "Parsed StringFileInfo");
    entries
}

fn read_string_tables(data: &[u8]) -> Vec<VersionEntry> {
    let mut entries = Vec::new();
    let mut offset = 0;
    while let Some(length) = data.read_u16_le_at(offset) {
        if length == 0 {
            offset += 2;
            continue;
        }
        let table_end = (offset + length as usize).min(data.len());
        if let Some(children) = data.get(offset + STRING_TABLE_CHILDREN..table_end) {
            entries.extend(read_strings(children));
        }
        offset += length as usize;
    }
    entries
}

fn read_strings(data: &[u8]) -> Vec<VersionEntry> {
    let mut entries = Vec::new();
    let mut offset = 0;
    while let Some(length) = data.read_u16_le_at(offset) {
        if length == 0 {
            offset += 2;
            continue;
        }
        let block = &data[offset..(offset + length as usize).min(data.len())];
        if let Some(entry) = read_string(block) {
            entries.push(entry);
        }
        offset += length as usize;
    }
    entries
}

fn read_string(block: &[u8]) -> Option<VersionEntry> {
    if block.read_u16_le_at(4)? != TEXT_VALUE {
        return None;
    }
    let key_bytes = block.get(BLOCK_HEADER_SIZE..)?;
    let key_len = utf16le_units(key_bytes) * 2;
    let name = read_utf16le(&key_bytes[..key_len]);

    let value_start = align4(BLOCK_HEADER_SIZE + key_len + 2);
    let value = read_utf16le(block.get(value_start..)?);
    if value.is_empty() {
        return None;
    }
    Some(VersionEntry { name, value })
}
