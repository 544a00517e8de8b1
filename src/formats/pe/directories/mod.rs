//! Data directory parsers

pub mod import;
pub mod resource;

pub use import::{imphash, normalize_library_name, parse_import_entries, ImportEntry, ImportHash};
pub use resource::{resource_type_name, walk_resources, ResourceLeaf, DEFAULT_MIME};
