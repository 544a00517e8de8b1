//! PE structural fingerprinting
//!
//! [`pe_inputs`] uses `object` to locate the pieces the structural hashes
//! need (the section holding the import directory, the resource tree, section
//! bytes); [`fingerprint_pe`] then runs each hash on its own so that one
//! malformed structure does not hide the others.

use std::collections::BTreeMap;

use object::read::pe::{ImageNtHeaders, ImageOptionalHeader, PeFile, PeFile32, PeFile64};
use object::{FileKind, LittleEndian as LE, Object};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub mod directories;
pub mod ordinals;
pub mod sections;
pub mod types;
pub mod utils;
pub mod version;

pub use directories::{
    imphash, normalize_library_name, parse_import_entries, resource_type_name, walk_resources,
    ImportEntry, ImportHash, ResourceLeaf, DEFAULT_MIME,
};
pub use ordinals::lookup_ordinal;
pub use sections::{detect_packer, SectionSummary};
pub use types::*;
pub use version::{parse_string_file_info, version_info, VersionEntry};

use crate::config::FingerprintConfig;
use crate::error::{HashComponent, HashError};

/// Header facts reported alongside the structural hashes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeHeader {
    /// `TimeDateStamp` in Unix seconds; `None` when zero
    pub compilation_timestamp: Option<u32>,
    pub entrypoint: u32,
    /// `x32` or `x64`, from the optional header magic
    pub target_machine: String,
    pub contained_sections: usize,
}

/// Everything the PE hashes read, borrowed from the file bytes
#[derive(Debug, Clone)]
pub struct PeInputs<'data> {
    pub header: PeHeader,
    pub sections: Vec<SectionSummary>,
    pub exports: Vec<String>,
    /// `None` when there is no import directory or no section holds it
    pub imports: Option<ImportDirectory<'data>>,
    /// `None` when the image carries no resource tree
    pub resources: Option<ResourceSection<'data>>,
}

/// Parse a PE image far enough to locate the structural hash inputs.
pub fn pe_inputs(data: &[u8]) -> Result<PeInputs<'_>> {
    match FileKind::parse(data)? {
        FileKind::Pe32 => collect_inputs(&PeFile32::parse(data)?, data),
        FileKind::Pe64 => collect_inputs(&PeFile64::parse(data)?, data),
        _ => Err(PeError::Object("not a PE image".to_string())),
    }
}

fn collect_inputs<'data, Pe: ImageNtHeaders>(
    pe: &PeFile<'data, Pe>,
    data: &'data [u8],
) -> Result<PeInputs<'data>> {
    let nt = pe.nt_headers();
    let is_64bit = nt.is_type_64();
    let timestamp = nt.file_header().time_date_stamp.get(LE);

    let mut sections = Vec::new();
    let mut section_data = Vec::new();
    let mut rsrc = None;
    for header in pe.section_table().iter() {
        let bytes = header.pe_data(data)?;
        let summary = SectionSummary::new(
            header.raw_name(),
            header.virtual_address.get(LE),
            header.virtual_size.get(LE),
            header.size_of_raw_data.get(LE),
            bytes,
        );
        if rsrc.is_none() && header.raw_name() == b".rsrc" {
            rsrc = Some(ResourceSection {
                data: bytes,
                virtual_address: summary.virtual_address,
            });
        }
        sections.push(summary);
        section_data.push(bytes);
    }

    // Section bytes and RVA of the data directory `index`, when non-empty
    // and inside a section.
    let directory = |index: usize| {
        let dir = pe.data_directories().get(index)?;
        let (rva, size) = (dir.virtual_address.get(LE), dir.size.get(LE));
        if size == 0 {
            return None;
        }
        let position = sections.iter().position(|s| s.contains_rva(rva))?;
        Some((section_data[position], sections[position].virtual_address, rva))
    };

    let imports = directory(IMAGE_DIRECTORY_ENTRY_IMPORT).map(|(section_data, section_rva, rva)| {
        ImportDirectory {
            section_data,
            directory_rva: rva,
            section_rva,
            is_64bit,
        }
    });

    // Resource offsets are relative to the root directory, so the section
    // bytes are rebased to start there.
    let resources = directory(IMAGE_DIRECTORY_ENTRY_RESOURCE)
        .and_then(|(bytes, section_rva, rva)| {
            let start = (rva - section_rva) as usize;
            Some(ResourceSection {
                data: bytes.get(start..)?,
                virtual_address: rva,
            })
        })
        .or(rsrc);

    let exports = match pe.exports() {
        Ok(exports) => exports
            .iter()
            .map(|e| String::from_utf8_lossy(e.name()).into_owned())
            .filter(|name| !name.is_empty())
            .collect(),
        Err(e) => {
            debug!(error = %e, "Unreadable export table");
            Vec::new()
        }
    };

    let header = PeHeader {
        compilation_timestamp: (timestamp != 0).then_some(timestamp),
        entrypoint: nt.optional_header().address_of_entry_point(),
        target_machine: if is_64bit { "x64" } else { "x32" }.to_string(),
        contained_sections: sections.len(),
    };

    debug!(
        sections = sections.len(),
        has_imports = imports.is_some(),
        has_resources = resources.is_some(),
        "Located PE fingerprint inputs"
    );

    Ok(PeInputs {
        header,
        sections,
        exports,
        imports,
        resources,
    })
}

/// Structural fingerprint of a PE image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeFingerprint {
    pub header: PeHeader,
    pub sections: Vec<SectionSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub exports: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub packer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub imphash: Option<String>,
    pub imports: BTreeMap<String, Vec<String>>,
    pub resources: Vec<ResourceLeaf>,
    pub resources_by_type: BTreeMap<String, usize>,
    pub resources_by_language: BTreeMap<u16, usize>,
    pub version_info: Vec<VersionEntry>,
}

/// Run the enabled PE hashes over `inputs`. Failures are appended to
/// `errors` and leave the affected fields empty.
pub fn fingerprint_pe(
    inputs: &PeInputs<'_>,
    config: &FingerprintConfig,
    errors: &mut Vec<HashError>,
) -> PeFingerprint {
    let mut fp = PeFingerprint {
        header: inputs.header.clone(),
        sections: inputs.sections.clone(),
        exports: inputs.exports.clone(),
        packer: detect_packer(&inputs.sections),
        ..Default::default()
    };

    if config.hashes.imphash {
        match imphash(inputs.imports.as_ref(), &config.parse) {
            Ok(hash) => {
                fp.imphash = Some(hash.imphash);
                fp.imports = hash.imports;
            }
            Err(e) => {
                warn!(error = %e, "Import hash failed");
                errors.push(HashError::new(HashComponent::Imphash, e));
            }
        }
    }

    if config.hashes.resources {
        if let Some(section) = &inputs.resources {
            match walk_resources(section, &config.parse) {
                Ok(leaves) => {
                    for leaf in &leaves {
                        *fp.resources_by_type.entry(leaf.type_label.clone()).or_default() += 1;
                        *fp.resources_by_language.entry(leaf.language).or_default() += 1;
                    }
                    fp.version_info = version_info(&leaves);
                    fp.resources = leaves;
                }
                Err(e) => {
                    warn!(error = %e, "Resource walk failed");
                    errors.push(HashError::new(HashComponent::Resources, e));
                }
            }
        }
    }

    fp
}
