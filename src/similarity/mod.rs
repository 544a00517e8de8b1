//! Fuzzy hashing over raw file bytes.

pub mod ssdeep;

pub use ssdeep::{
    parse_ssdeep, ssdeep_bytes, ssdeep_reader, FuzzyHashState, SsdeepDigest, SSDEEP_MIN_FILE_SIZE,
};
