//! # Symbols Module
//!
//! Format-agnostic symbol hashing. Format adapters (`formats::elf`,
//! `formats::macho`) turn symbol tables into [`RawSymbol`] records; this
//! module filters and canonicalizes them into symhash / telfhash input.

pub mod normalize;
pub mod types;

pub use normalize::{
    digest_input, is_excluded, macho_symhash, normalize_symbols, symhash, telfhash,
    CallTargetRecovery, Md5Digest, NoCallTargets, SimilarityDigest,
};
pub use types::{
    MachoSymbols, RawSymbol, SymbolBinding, SymbolOrigin, SymbolTables, SymbolVisibility,
};
