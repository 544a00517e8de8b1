//! Whole-file fingerprint
//!
//! Combines the content digests of a file with the structural hashes of
//! its container. Each structural hash runs independently: a failure is
//! recorded in [`FileFingerprint::errors`] and the remaining hashes are
//! still computed.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::FingerprintConfig;
use crate::error::{HashComponent, HashError, Result};
use crate::formats::elf::{symbol_tables, ElfFingerprint};
use crate::formats::macho::{macho_image, macho_symbols, MachoFingerprint};
use crate::formats::pe::{fingerprint_pe, pe_inputs, PeFingerprint};
use crate::formats::ContainerKind;
use crate::hashing::{md5_digest, sha1_digest, sha256_digest};
use crate::io::MappedFile;
use crate::similarity::ssdeep_bytes;
use crate::symbols::{macho_symhash, symhash, telfhash, CallTargetRecovery, NoCallTargets, SimilarityDigest};

/// Bytes given to the content sniffer
const SNIFF_SIZE: usize = 8192;

/// External algorithms the fingerprint delegates to
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Similarity digest for telfhash (TLSH); telfhash is skipped without one
    pub similarity: Option<&'a dyn SimilarityDigest>,
    /// Call-target recovery for ELF images without symbol tables
    pub recovery: &'a dyn CallTargetRecovery,
}

impl Default for Collaborators<'_> {
    fn default() -> Self {
        Self {
            similarity: None,
            recovery: &NoCallTargets,
        }
    }
}

/// Identity and similarity signatures of one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFingerprint {
    pub mime: String,
    pub size: u64,
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ssdeep: Option<String>,
    pub container: ContainerKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pe: Option<PeFingerprint>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub elf: Option<ElfFingerprint>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub macho: Option<MachoFingerprint>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<HashError>,
}

impl FileFingerprint {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// True when no sub-computation failed.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Content type of `data`: a magic-number match, else `text/plain` when
/// the sniffed head is valid UTF-8 and `application/octet-stream` otherwise.
pub fn sniff_mime(data: &[u8]) -> String {
    let head = &data[..data.len().min(SNIFF_SIZE)];
    match infer::get(head) {
        Some(kind) => kind.mime_type().to_string(),
        None if is_utf8_prefix(head) => "text/plain".to_string(),
        None => "application/octet-stream".to_string(),
    }
}

/// Valid UTF-8, allowing a multi-byte sequence cut off at the end.
fn is_utf8_prefix(head: &[u8]) -> bool {
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

/// Fingerprint an in-memory file.
pub fn fingerprint_bytes(
    data: &[u8],
    config: &FingerprintConfig,
    collaborators: &Collaborators<'_>,
) -> FileFingerprint {
    let container = ContainerKind::detect(data);
    let mut fp = FileFingerprint {
        mime: sniff_mime(data),
        size: data.len() as u64,
        md5: md5_digest(data),
        sha1: sha1_digest(data),
        sha256: sha256_digest(data),
        ssdeep: None,
        container,
        pe: None,
        elf: None,
        macho: None,
        errors: Vec::new(),
    };

    if config.hashes.ssdeep {
        match ssdeep_bytes(data) {
            Ok(digest) => fp.ssdeep = digest,
            Err(e) => record(&mut fp.errors, HashComponent::Ssdeep, e),
        }
    }

    match container {
        ContainerKind::Pe => match pe_inputs(data) {
            Ok(inputs) => fp.pe = Some(fingerprint_pe(&inputs, config, &mut fp.errors)),
            Err(e) => record(&mut fp.errors, HashComponent::Container, e),
        },
        ContainerKind::Elf if config.hashes.symbols => {
            fp.elf = Some(fingerprint_elf(data, collaborators, &mut fp.errors));
        }
        kind if kind.is_macho() && config.hashes.symbols => {
            fp.macho = Some(fingerprint_macho(data, &mut fp.errors));
        }
        _ => {}
    }

    info!(
        mime = %fp.mime,
        size = fp.size,
        container = ?fp.container,
        errors = fp.errors.len(),
        "Fingerprinted file"
    );
    fp
}

/// Fingerprint a file on disk, refusing files over `config.io.max_file_size`.
pub fn fingerprint_file<P: AsRef<Path>>(
    path: P,
    config: &FingerprintConfig,
    collaborators: &Collaborators<'_>,
) -> Result<FileFingerprint> {
    let file = MappedFile::open(path, &config.io.limits())?;
    Ok(fingerprint_bytes(file.as_slice(), config, collaborators))
}

fn fingerprint_elf(
    data: &[u8],
    collaborators: &Collaborators<'_>,
    errors: &mut Vec<HashError>,
) -> ElfFingerprint {
    let mut fp = ElfFingerprint::default();
    let tables = match symbol_tables(data) {
        Ok(tables) => tables,
        Err(e) => {
            record(errors, HashComponent::Container, e);
            return fp;
        }
    };

    match symhash(&tables, collaborators.recovery) {
        Ok(hash) => fp.symhash = Some(hash),
        Err(e) => record(errors, HashComponent::Symhash, e),
    }
    if let Some(digest) = collaborators.similarity {
        match telfhash(&tables, collaborators.recovery, digest) {
            Ok(hash) => fp.telfhash = Some(hash),
            Err(e) => record(errors, HashComponent::Telfhash, e),
        }
    }
    fp
}

fn fingerprint_macho(data: &[u8], errors: &mut Vec<HashError>) -> MachoFingerprint {
    let container = match macho_symbols(data) {
        Ok(container) => container,
        Err(e) => {
            record(errors, HashComponent::Container, e);
            return MachoFingerprint::default();
        }
    };
    let symhash = match macho_symhash(&container) {
        Ok(hash) => hash,
        Err(e) => {
            record(errors, HashComponent::Symhash, e);
            String::new()
        }
    };
    let image = match macho_image(data) {
        Ok(image) => image,
        Err(e) => {
            record(errors, HashComponent::Container, e);
            None
        }
    };
    MachoFingerprint {
        is_fat: container.is_fat,
        symhash,
        image,
    }
}

fn record(errors: &mut Vec<HashError>, component: HashComponent, err: impl std::fmt::Display) {
    warn!(%component, error = %err, "Fingerprint component failed");
    errors.push(HashError::new(component, err));
}
