//! Container adapters
//!
//! Each adapter turns one executable format into the inputs of the
//! structural hashes. Container detection goes through `object`.

use object::FileKind;
use serde::{Deserialize, Serialize};

pub mod elf;
pub mod macho;
pub mod pe;

/// Executable container recognized by the fingerprinter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    Pe,
    Elf,
    MachO,
    /// Universal binary holding several Mach-O slices
    MachOFat,
    /// Anything else, including unparseable input
    Other,
}

impl ContainerKind {
    pub fn detect(data: &[u8]) -> Self {
        match FileKind::parse(data) {
            Ok(FileKind::Pe32 | FileKind::Pe64) => ContainerKind::Pe,
            Ok(FileKind::Elf32 | FileKind::Elf64) => ContainerKind::Elf,
            Ok(FileKind::MachO32 | FileKind::MachO64) => ContainerKind::MachO,
            Ok(FileKind::MachOFat32 | FileKind::MachOFat64) => ContainerKind::MachOFat,
            _ => ContainerKind::Other,
        }
    }

    pub fn is_macho(self) -> bool {
        matches!(self, ContainerKind::MachO | ContainerKind::MachOFat)
    }
}
