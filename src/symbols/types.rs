//! Symbol records consumed by the symbol normalizer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbol binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolBinding {
    Local,
    Global,
    Weak,
    /// Any other binding (e.g. ELF `STB_GNU_UNIQUE`)
    Other,
}

impl SymbolBinding {
    /// Decode the binding nibble of an ELF `st_info`.
    pub fn from_elf(st_info: u8) -> Self {
        match st_info >> 4 {
            0 => SymbolBinding::Local,
            1 => SymbolBinding::Global,
            2 => SymbolBinding::Weak,
            _ => SymbolBinding::Other,
        }
    }
}

impl fmt::Display for SymbolBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolBinding::Local => write!(f, "Local"),
            SymbolBinding::Global => write!(f, "Global"),
            SymbolBinding::Weak => write!(f, "Weak"),
            SymbolBinding::Other => write!(f, "Other"),
        }
    }
}

/// Symbol visibility levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolVisibility {
    Default,
    Internal,
    Hidden,
    Protected,
}

impl SymbolVisibility {
    /// Decode the visibility bits of an ELF `st_other`.
    pub fn from_elf(st_other: u8) -> Self {
        match st_other & 0x3 {
            0 => SymbolVisibility::Default,
            1 => SymbolVisibility::Internal,
            2 => SymbolVisibility::Hidden,
            _ => SymbolVisibility::Protected,
        }
    }
}

impl fmt::Display for SymbolVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolVisibility::Default => write!(f, "Default"),
            SymbolVisibility::Internal => write!(f, "Internal"),
            SymbolVisibility::Hidden => write!(f, "Hidden"),
            SymbolVisibility::Protected => write!(f, "Protected"),
        }
    }
}

/// Which table a symbol came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolOrigin {
    Dynamic,
    Static,
}

/// A symbol as reported by a format parser
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawSymbol {
    pub name: String,
    pub is_function: bool,
    pub binding: SymbolBinding,
    pub visibility: SymbolVisibility,
    pub origin: SymbolOrigin,
}

impl RawSymbol {
    /// A global, default-visibility function symbol.
    pub fn function(name: impl Into<String>, origin: SymbolOrigin) -> Self {
        Self {
            name: name.into(),
            is_function: true,
            binding: SymbolBinding::Global,
            visibility: SymbolVisibility::Default,
            origin,
        }
    }

    /// Build a record from raw ELF `st_info`/`st_other` bytes.
    pub fn from_elf(name: impl Into<String>, st_info: u8, st_other: u8, origin: SymbolOrigin) -> Self {
        const STT_FUNC: u8 = 2;
        Self {
            name: name.into(),
            is_function: st_info & 0xF == STT_FUNC,
            binding: SymbolBinding::from_elf(st_info),
            visibility: SymbolVisibility::from_elf(st_other),
            origin,
        }
    }
}

/// Dynamic and static symbol tables of one ELF-style binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTables {
    pub dynamic: Vec<RawSymbol>,
    pub statics: Vec<RawSymbol>,
}

impl SymbolTables {
    /// True when the binary exposes neither a dynamic nor a static symbol.
    pub fn is_empty(&self) -> bool {
        self.dynamic.is_empty() && self.statics.is_empty()
    }

    /// All symbols, dynamic first.
    pub fn iter(&self) -> impl Iterator<Item = &RawSymbol> {
        self.dynamic.iter().chain(self.statics.iter())
    }
}

/// Symbol view of a Mach-O container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachoSymbols {
    /// Fat/universal container; symhash does not apply
    pub is_fat: bool,
    /// Names of the undefined symbols as stored in the string table,
    /// including the leading `_`. `None` when the image lacks `LC_SYMTAB`
    /// or `LC_DYSYMTAB`.
    pub undefined: Option<Vec<String>>,
}
