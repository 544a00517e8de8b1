//! Import table normalization and imphash computation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::formats::pe::ordinals::lookup_ordinal;
use crate::formats::pe::types::*;
use crate::formats::pe::utils::{read_cstring, rva_to_offset, u32_at, u64_at, ReadExt};
use crate::hashing::EMPTY_MD5;

/// One import, in the order it appears in the import table
///
/// The string fields decode names lossily, with invalid UTF-8 replaced by
/// U+FFFD. The `raw_*` fields keep the stored bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    /// DLL name as stored in the binary, without the NUL
    pub raw_dll_name: Vec<u8>,
    pub dll_name: String,
    /// Lowercased DLL name without `.dll`/`.ocx`/`.sys`
    pub library: String,
    /// Lowercased function name (ordinals resolved through the ordinal table)
    pub function: String,
    /// Function name bytes as stored; `None` for ordinal imports
    pub raw_name: Option<Vec<u8>>,
    pub name: Option<String>,
    pub ordinal: Option<u32>,
}

impl ImportEntry {
    /// The `<library>.<function>` token fed into the imphash
    pub fn token(&self) -> String {
        format!("{}.{}", self.library, self.function)
    }
}

/// Import hash plus the per-DLL mapping of named imports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportHash {
    pub imphash: String,
    /// Lowercase DLL name -> function names in import order (ordinals
    /// excluded). Names are lossily decoded; see [`ImportEntry`] for bytes.
    pub imports: BTreeMap<String, Vec<String>>,
}

impl ImportHash {
    /// Result for binaries without an import directory
    pub fn not_applicable() -> Self {
        Self {
            imphash: EMPTY_MD5.to_string(),
            imports: BTreeMap::new(),
        }
    }
}

/// Lowercase a library name and strip a trailing `.ocx`, `.sys` or `.dll`.
pub fn normalize_library_name(name: &str) -> String {
    let lower = name.to_lowercase();
    for ext in [".ocx", ".sys", ".dll"] {
        if let Some(stem) = lower.strip_suffix(ext) {
            return stem.to_string();
        }
    }
    lower
}

/// Compute the imphash of an import directory.
///
/// `None` means the binary has no optional header or no import directory;
/// the result is then the MD5-of-nothing sentinel with an empty mapping.
pub fn imphash(dir: Option<&ImportDirectory<'_>>, options: &ParseOptions) -> Result<ImportHash> {
    let Some(dir) = dir else {
        return Ok(ImportHash::not_applicable());
    };

    let entries = parse_import_entries(dir, options)?;
    let tokens: Vec<String> = entries.iter().map(ImportEntry::token).collect();

    let mut imports: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in &entries {
        if let Some(name) = &entry.name {
            imports
                .entry(entry.dll_name.to_lowercase())
                .or_default()
                .push(name.clone());
        }
    }

    let joined = tokens.join(",");
    Ok(ImportHash {
        imphash: format!("{:032x}", md5::compute(joined.as_bytes())),
        imports,
    })
}

/// Walk the import descriptors and their thunk arrays in table order.
pub fn parse_import_entries(
    dir: &ImportDirectory<'_>,
    options: &ParseOptions,
) -> Result<Vec<ImportEntry>> {
    let data = dir.section_data;
    let mut offset = rva_to_offset(dir.directory_rva, dir.section_rva)?;
    if offset > data.len() {
        return Err(PeError::InvalidOffset { offset });
    }

    let mut entries = Vec::new();
    let mut descriptors = 0usize;

    // A descriptor cut off by the end of the section ends the table, the same
    // as the all-zero terminator would.
    while data.read_slice_at(offset, IMPORT_DESCRIPTOR_SIZE).is_some() {
        let lookup_rva = u32_at(data, offset)?;
        if lookup_rva == 0 {
            break;
        }
        let name_rva = u32_at(data, offset + 12)?;
        offset += IMPORT_DESCRIPTOR_SIZE;
        descriptors += 1;

        let dll_bytes = read_cstring(data, rva_to_offset(name_rva, dir.section_rva)?)?;
        let dll = DllName {
            raw: dll_bytes,
            name: String::from_utf8_lossy(dll_bytes).into_owned(),
        };
        let library = normalize_library_name(&dll.name);

        let thunk_offset = rva_to_offset(lookup_rva, dir.section_rva)?;
        parse_thunks(data, dir, thunk_offset, &dll, &library, options, &mut entries)?;
    }

    debug!(
        descriptors = descriptors,
        entries = entries.len(),
        is_64bit = dir.is_64bit,
        "Parsed import table"
    );
    Ok(entries)
}

struct DllName<'a> {
    raw: &'a [u8],
    name: String,
}

fn parse_thunks(
    data: &[u8],
    dir: &ImportDirectory<'_>,
    mut thunk_offset: usize,
    dll: &DllName<'_>,
    library: &str,
    options: &ParseOptions,
    entries: &mut Vec<ImportEntry>,
) -> Result<()> {
    let entry_size = if dir.is_64bit { 8 } else { 4 };

    while thunk_offset < data.len() {
        let value = if dir.is_64bit {
            u64_at(data, thunk_offset)?
        } else {
            u32_at(data, thunk_offset)? as u64
        };
        if value == 0 {
            break;
        }

        let ordinal = if dir.is_64bit {
            (value & (1u64 << 63) != 0).then_some((value & 0xFFFF_FFFF) as u32)
        } else {
            (value & (1u64 << 31) != 0).then_some((value & 0xFFFF) as u32)
        };

        let (raw_name, function) = match ordinal {
            Some(ord) => (None, lookup_ordinal(library, ord).to_lowercase()),
            None => {
                // Skip the two-byte hint in front of the name
                let hint_offset = rva_to_offset(value as u32, dir.section_rva)?;
                let name_offset = hint_offset
                    .checked_add(2)
                    .ok_or(PeError::InvalidOffset {
                        offset: hint_offset,
                    })?;
                let raw = read_cstring(data, name_offset)?;
                let lowered = String::from_utf8_lossy(raw).to_lowercase();
                (Some(raw), lowered)
            }
        };

        if entries.len() >= options.max_imports {
            return Err(PeError::LimitExceeded("import entries"));
        }
        entries.push(ImportEntry {
            raw_dll_name: dll.raw.to_vec(),
            dll_name: dll.name.clone(),
            library: library.to_string(),
            function,
            name: raw_name.map(|raw| String::from_utf8_lossy(raw).into_owned()),
            raw_name: raw_name.map(<[u8]>::to_vec),
            ordinal,
        });

        thunk_offset += entry_size;
    }

    Ok(())
}
