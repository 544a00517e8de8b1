//! ELF symbol tables for symhash / telfhash

use object::{Object, ObjectSymbol, SymbolFlags};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::symbols::{RawSymbol, SymbolBinding, SymbolOrigin, SymbolTables, SymbolVisibility};

/// Read `.dynsym` and `.symtab` of an ELF image into [`SymbolTables`].
///
/// Missing tables are empty; both empty is what triggers call-target
/// recovery in the normalizer.
pub fn symbol_tables(data: &[u8]) -> Result<SymbolTables> {
    let file = object::File::parse(data)?;
    if file.format() != object::BinaryFormat::Elf {
        return Err(crate::error::FingerprintError::InvalidFormat(
            "not an ELF image".to_string(),
        ));
    }

    let mut tables = SymbolTables::default();
    // Index 0 is the reserved null entry of each table
    for sym in file.dynamic_symbols().filter(|s| s.index().0 != 0) {
        tables.dynamic.push(raw_symbol(&sym, SymbolOrigin::Dynamic)?);
    }
    for sym in file.symbols().filter(|s| s.index().0 != 0) {
        tables.statics.push(raw_symbol(&sym, SymbolOrigin::Static)?);
    }

    debug!(
        dynamic = tables.dynamic.len(),
        statics = tables.statics.len(),
        "Read ELF symbol tables"
    );
    Ok(tables)
}

fn raw_symbol<'data, S: ObjectSymbol<'data>>(sym: &S, origin: SymbolOrigin) -> Result<RawSymbol> {
    let name = String::from_utf8_lossy(sym.name_bytes()?).into_owned();
    Ok(match sym.flags() {
        SymbolFlags::Elf { st_info, st_other } => RawSymbol::from_elf(name, st_info, st_other, origin),
        // Not reachable for ELF input; derive from the generic view.
        _ => RawSymbol {
            name,
            is_function: sym.kind() == object::SymbolKind::Text,
            binding: if sym.is_weak() {
                SymbolBinding::Weak
            } else if sym.is_global() {
                SymbolBinding::Global
            } else {
                SymbolBinding::Local
            },
            visibility: SymbolVisibility::Default,
            origin,
        },
    })
}

/// Symbol hashes of an ELF image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElfFingerprint {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub symhash: Option<String>,
    /// Present only when a similarity digest was supplied
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub telfhash: Option<String>,
}
