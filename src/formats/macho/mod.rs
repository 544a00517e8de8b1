//! Mach-O symbol view and image summary
//!
//! Only thin images are read. Fat/universal containers are flagged and left
//! alone; splitting them into slices is the caller's business.

use object::macho;
use object::read::macho::{MachHeader, MachOFile, MachOFile32, MachOFile64, Nlist};
use object::{Endianness, FileKind, Object, ObjectSection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entropy::rounded_entropy;
use crate::error::{FingerprintError, Result};
use crate::hashing::md5_digest;
use crate::symbols::MachoSymbols;

/// Section name UPX gives the packed text
const UPX_SECTION: &[u8] = b"upxTEXT";

/// Build the symhash input of a Mach-O file.
///
/// The hashed set is every symbol table entry whose `N_TYPE` bits are zero
/// (undefined), named exactly as in the string table. Images lacking either
/// `LC_SYMTAB` or `LC_DYSYMTAB` have no symhash input.
pub fn macho_symbols(data: &[u8]) -> Result<MachoSymbols> {
    match FileKind::parse(data)? {
        FileKind::MachOFat32 | FileKind::MachOFat64 => Ok(MachoSymbols {
            is_fat: true,
            undefined: None,
        }),
        FileKind::MachO32 => thin_symbols(&MachOFile32::<Endianness>::parse(data)?),
        FileKind::MachO64 => thin_symbols(&MachOFile64::<Endianness>::parse(data)?),
        _ => Err(not_macho()),
    }
}

/// Summarize a thin Mach-O image; `None` for fat containers.
pub fn macho_image(data: &[u8]) -> Result<Option<MachoImage>> {
    match FileKind::parse(data)? {
        FileKind::MachOFat32 | FileKind::MachOFat64 => Ok(None),
        FileKind::MachO32 => thin_image(&MachOFile32::<Endianness>::parse(data)?).map(Some),
        FileKind::MachO64 => thin_image(&MachOFile64::<Endianness>::parse(data)?).map(Some),
        _ => Err(not_macho()),
    }
}

fn not_macho() -> FingerprintError {
    FingerprintError::InvalidFormat("not a Mach-O image".to_string())
}

/// Symbol table commands of a thin image
struct SymbolCommands {
    has_symtab: bool,
    /// `(iundefsym, nundefsym)` from `LC_DYSYMTAB`
    undefined_range: Option<(usize, usize)>,
}

fn symbol_commands<Mach: MachHeader<Endian = Endianness>>(
    file: &MachOFile<'_, Mach>,
) -> Result<SymbolCommands> {
    let endian = file.macho_header().endian()?;
    let mut commands = SymbolCommands {
        has_symtab: false,
        undefined_range: None,
    };
    let mut iter = file.macho_load_commands()?;
    while let Some(command) = iter.next()? {
        if command.symtab()?.is_some() {
            commands.has_symtab = true;
        } else if let Some(dysymtab) = command.dysymtab()? {
            commands.undefined_range = Some((
                dysymtab.iundefsym.get(endian) as usize,
                dysymtab.nundefsym.get(endian) as usize,
            ));
        }
    }
    Ok(commands)
}

fn thin_symbols<Mach: MachHeader<Endian = Endianness>>(
    file: &MachOFile<'_, Mach>,
) -> Result<MachoSymbols> {
    let commands = symbol_commands(file)?;
    if !commands.has_symtab || commands.undefined_range.is_none() {
        debug!(
            has_symtab = commands.has_symtab,
            has_dysymtab = commands.undefined_range.is_some(),
            "Mach-O image lacks symbol table commands"
        );
        return Ok(MachoSymbols {
            is_fat: false,
            undefined: None,
        });
    }

    let endian = file.macho_header().endian()?;
    let symtab = file.macho_symbol_table();
    let mut undefined = Vec::new();
    for nlist in symtab.iter() {
        if nlist.n_type() & macho::N_TYPE == macho::N_UNDF {
            let name = nlist.name(endian, symtab.strings())?;
            undefined.push(String::from_utf8_lossy(name).into_owned());
        }
    }

    debug!(undefined = undefined.len(), "Read Mach-O undefined symbols");
    Ok(MachoSymbols {
        is_fat: false,
        undefined: Some(undefined),
    })
}

fn cpu_name(cputype: u32) -> &'static str {
    match cputype {
        macho::CPU_TYPE_X86 => "x86",
        macho::CPU_TYPE_X86_64 => "x86_64",
        macho::CPU_TYPE_ARM => "arm",
        macho::CPU_TYPE_ARM64 => "arm64",
        macho::CPU_TYPE_POWERPC => "ppc",
        macho::CPU_TYPE_POWERPC64 => "ppc64",
        _ => "unknown",
    }
}

fn thin_image<Mach: MachHeader<Endian = Endianness>>(
    file: &MachOFile<'_, Mach>,
) -> Result<MachoImage> {
    let header = file.macho_header();
    let endian = header.endian()?;

    let mut sections = Vec::new();
    let mut packer = None;
    for section in file.sections() {
        let name = section.name_bytes()?;
        if name == UPX_SECTION {
            packer = Some("upx".to_string());
        }
        // Zero-fill sections have a size but no file bytes
        let (entropy, md5) = match section.data() {
            Ok(bytes) if bytes.len() as u64 == section.size() => {
                (rounded_entropy(bytes), Some(md5_digest(bytes)))
            }
            _ => (0.0, None),
        };
        sections.push(MachoSection {
            name: String::from_utf8_lossy(name).into_owned(),
            address: section.address(),
            size: section.size(),
            entropy,
            md5,
        });
    }

    let mut libraries = Vec::new();
    let mut iter = file.macho_load_commands()?;
    while let Some(command) = iter.next()? {
        if command.cmd() != macho::LC_LOAD_DYLIB {
            continue;
        }
        if let Some(dylib) = command.dylib()? {
            let name = command.string(endian, dylib.dylib.name)?;
            libraries.push(String::from_utf8_lossy(name).into_owned());
        }
    }

    // Imported symbols are the undefined range LC_DYSYMTAB declares
    let mut imports = Vec::new();
    if let Some((first, count)) = symbol_commands(file)?.undefined_range {
        let symtab = file.macho_symbol_table();
        for nlist in symtab.iter().skip(first).take(count) {
            let name = nlist.name(endian, symtab.strings())?;
            imports.push(String::from_utf8_lossy(name).into_owned());
        }
    }

    let exports = match file.exports() {
        Ok(exports) => exports
            .iter()
            .map(|e| String::from_utf8_lossy(e.name()).into_owned())
            .collect(),
        Err(e) => {
            debug!(error = %e, "Unreadable Mach-O exports");
            Vec::new()
        }
    };

    debug!(
        sections = sections.len(),
        libraries = libraries.len(),
        imports = imports.len(),
        "Summarized Mach-O image"
    );
    Ok(MachoImage {
        cpu: cpu_name(header.cputype(endian)).to_string(),
        sections,
        libraries,
        imports,
        exports,
        packer,
    })
}

/// Placement and identity of one Mach-O section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachoSection {
    pub name: String,
    pub address: u64,
    pub size: u64,
    pub entropy: f64,
    /// Absent for zero-fill sections
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub md5: Option<String>,
}

/// Structural summary of a thin Mach-O image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachoImage {
    /// `x86`, `x86_64`, `arm`, `arm64`, `ppc`, `ppc64` or `unknown`
    pub cpu: String,
    pub sections: Vec<MachoSection>,
    /// `LC_LOAD_DYLIB` install names in load-command order
    pub libraries: Vec<String>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub packer: Option<String>,
}

/// Mach-O fingerprint; `image` is absent for fat containers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachoFingerprint {
    pub is_fat: bool,
    /// Empty for fat containers and images without symbol tables
    pub symhash: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image: Option<MachoImage>,
}
