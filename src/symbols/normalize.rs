//! Symbol filtering and canonicalization for symhash / telfhash.
//!
//! Names that vary with the toolchain rather than with the program (libc
//! entry glue, architecture-specific helpers, string/memory builtins that
//! compilers rewrite) are dropped; the rest are lowercased and sorted so the
//! digest does not depend on symbol table order.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::Result;
use crate::symbols::types::{MachoSymbols, RawSymbol, SymbolBinding, SymbolTables, SymbolVisibility};

static EXCLUDED_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "__libc_start_main",
        "main",
        "abort",
        "cachectl",
        "cacheflush",
        "puts",
        "atol",
        "malloc_trim",
    ]
    .into_iter()
    .collect()
});

/// Textual prefixes that exclude a symbol. These are plain prefix tests, so
/// `stream` and `memoize` are excluded too; existing corpora depend on it.
const EXCLUDED_PREFIXES: &[&str] = &[".", "_", "str", "mem"];
const EXCLUDED_SUFFIXES: &[&str] = &["64"];

/// Digest applied to the canonical symbol string.
pub trait SimilarityDigest {
    fn digest(&self, input: &[u8]) -> Result<String>;
}

/// MD5 digest, as used by symhash.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Digest;

impl SimilarityDigest for Md5Digest {
    fn digest(&self, input: &[u8]) -> Result<String> {
        Ok(format!("{:032x}", md5::compute(input)))
    }
}

/// Supplies call targets recovered from code when a binary has no symbol
/// tables at all (fully stripped static binaries).
pub trait CallTargetRecovery {
    /// Call-target strings in discovery order.
    fn recover_call_targets(&self) -> Result<Vec<String>>;
}

/// Recovery collaborator for callers without a disassembler.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCallTargets;

impl CallTargetRecovery for NoCallTargets {
    fn recover_call_targets(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// True when the symbol does not take part in the symbol hash.
pub fn is_excluded(symbol: &RawSymbol) -> bool {
    if !symbol.is_function
        || symbol.binding != SymbolBinding::Global
        || symbol.visibility != SymbolVisibility::Default
    {
        return true;
    }
    let name = symbol.name.as_str();
    name.is_empty()
        || EXCLUDED_NAMES.contains(name)
        || EXCLUDED_PREFIXES.iter().any(|p| name.starts_with(p))
        || EXCLUDED_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Surviving symbol names, lowercased and sorted ascending.
pub fn normalize_symbols<'a, I>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a RawSymbol>,
{
    let mut names: Vec<String> = symbols
        .into_iter()
        .filter(|s| !is_excluded(s))
        .map(|s| s.name.to_lowercase())
        .collect();
    names.sort();
    names
}

/// The exact string fed to the digest.
///
/// With no symbol tables the recovered call targets are used verbatim and in
/// the order supplied.
pub fn digest_input(tables: &SymbolTables, recovery: &dyn CallTargetRecovery) -> Result<String> {
    if tables.is_empty() {
        let targets = recovery.recover_call_targets()?;
        debug!(targets = targets.len(), "No symbol tables; using recovered call targets");
        return Ok(targets.join(","));
    }
    let names = normalize_symbols(tables.iter());
    debug!(
        total = tables.dynamic.len() + tables.statics.len(),
        kept = names.len(),
        "Normalized symbol tables"
    );
    Ok(names.join(","))
}

/// MD5 symbol hash over the normalized symbol tables.
pub fn symhash(tables: &SymbolTables, recovery: &dyn CallTargetRecovery) -> Result<String> {
    let input = digest_input(tables, recovery)?;
    Md5Digest.digest(input.as_bytes())
}

/// ELF similarity hash: the normalized symbol string through an external
/// similarity digest (TLSH for telfhash), lowercased.
pub fn telfhash(
    tables: &SymbolTables,
    recovery: &dyn CallTargetRecovery,
    digest: &dyn SimilarityDigest,
) -> Result<String> {
    let input = digest_input(tables, recovery)?;
    Ok(digest.digest(input.as_bytes())?.to_lowercase())
}

/// Mach-O symhash: MD5 over the undefined symbol names, sorted bytewise and
/// joined with `,`. Names are hashed as stored; the exclusion rules and
/// lowercasing of [`symhash`] do not apply. Empty for fat containers and
/// images without symbol tables.
pub fn macho_symhash(container: &MachoSymbols) -> Result<String> {
    if container.is_fat {
        return Ok(String::new());
    }
    let Some(undefined) = &container.undefined else {
        return Ok(String::new());
    };
    let mut names: Vec<&str> = undefined.iter().map(String::as_str).collect();
    names.sort_unstable();
    Md5Digest.digest(names.join(",").as_bytes())
}
