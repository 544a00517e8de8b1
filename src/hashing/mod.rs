//! Centralized module for the digest algorithms used by fingerprints.

use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Computes the SHA-256 digest of the given data and returns it as a hex string.
pub fn sha256_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes the SHA-1 digest of the given data and returns it as a hex string.
pub fn sha1_digest(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Computes the MD5 digest of the given data and returns it as a hex string.
pub fn md5_digest(data: &[u8]) -> String {
    format!("{:032x}", md5::compute(data))
}

/// MD5 of the empty string, the imphash "not applicable" sentinel.
pub const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";
