//! ssdeep context-triggered piecewise hash.
//!
//! Reproduces the spamsum construction bit for bit: a 7-byte rolling hash
//! decides piece boundaries, two FNV-style block hashes summarize each piece
//! at block size `bs` and `2 * bs`. The block size starts at the smallest
//! `3 * 2^k` that covers the input in 64 pieces and is halved until the first
//! digest holds at least 32 pieces.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{FingerprintError, Result};

/// Inputs shorter than this produce no digest.
pub const SSDEEP_MIN_FILE_SIZE: u64 = 4096;

const ROLLING_WINDOW: usize = 7;
const BLOCK_MIN: u64 = 3;
const SPAMSUM_LENGTH: usize = 64;
const HASH_PRIME: u32 = 0x0100_0193;
const HASH_INIT: u32 = 0x2802_1967;
const B64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, Default)]
struct RollingHash {
    window: [u8; ROLLING_WINDOW],
    h1: u32,
    h2: u32,
    h3: u32,
    n: usize,
}

impl RollingHash {
    #[inline]
    fn update(&mut self, c: u8) {
        let c32 = c as u32;
        self.h2 = self.h2.wrapping_sub(self.h1);
        self.h2 = self.h2.wrapping_add((ROLLING_WINDOW as u32).wrapping_mul(c32));
        self.h1 = self.h1.wrapping_add(c32);
        self.h1 = self.h1.wrapping_sub(self.window[self.n] as u32);
        self.window[self.n] = c;
        self.n = (self.n + 1) % ROLLING_WINDOW;
        self.h3 = (self.h3 << 5) ^ c32;
    }

    #[inline]
    fn sum(&self) -> u32 {
        self.h1.wrapping_add(self.h2).wrapping_add(self.h3)
    }
}

#[inline]
fn sum_hash(c: u8, h: u32) -> u32 {
    h.wrapping_mul(HASH_PRIME) ^ c as u32
}

#[inline]
fn b64(h: u32) -> char {
    B64[(h % 64) as usize] as char
}

/// State of one digest computation.
///
/// Reset and retried as a unit when the block size is halved.
#[derive(Debug, Clone)]
pub struct FuzzyHashState {
    rolling: RollingHash,
    block_size: u64,
    hash1: String,
    hash2: String,
    block_hash1: u32,
    block_hash2: u32,
}

impl FuzzyHashState {
    /// Fresh state with the initial block size for an input of `len` bytes.
    pub fn new(len: u64) -> Self {
        let mut block_size = BLOCK_MIN;
        while block_size.saturating_mul(SPAMSUM_LENGTH as u64) < len {
            block_size *= 2;
        }
        Self {
            rolling: RollingHash::default(),
            block_size,
            hash1: String::with_capacity(SPAMSUM_LENGTH),
            hash2: String::with_capacity(SPAMSUM_LENGTH / 2),
            block_hash1: HASH_INIT,
            block_hash2: HASH_INIT,
        }
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    #[inline]
    fn process_byte(&mut self, c: u8) {
        self.block_hash1 = sum_hash(c, self.block_hash1);
        self.block_hash2 = sum_hash(c, self.block_hash2);
        self.rolling.update(c);

        let rh = self.rolling.sum() as u64;
        let bs = self.block_size;
        if rh % bs == bs - 1 {
            if self.hash1.len() < SPAMSUM_LENGTH - 1 {
                self.hash1.push(b64(self.block_hash1));
                self.block_hash1 = HASH_INIT;
            }
            if rh % (bs * 2) == bs * 2 - 1 && self.hash2.len() < SPAMSUM_LENGTH / 2 - 1 {
                self.hash2.push(b64(self.block_hash2));
                self.block_hash2 = HASH_INIT;
            }
        }
    }

    /// One full pass over `reader` with a fresh rolling window.
    fn process<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        self.rolling = RollingHash::default();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            for &c in &buf[..n] {
                self.process_byte(c);
            }
        }
        Ok(())
    }

    /// Halve the block size and drop everything produced so far.
    fn retry_smaller(&mut self) {
        self.block_size /= 2;
        self.block_hash1 = HASH_INIT;
        self.block_hash2 = HASH_INIT;
        self.hash1.clear();
        self.hash2.clear();
    }

    fn finish(mut self) -> String {
        if self.rolling.sum() != 0 {
            self.hash1.push(b64(self.block_hash1));
            self.hash2.push(b64(self.block_hash2));
        }
        format!("{}:{}:{}", self.block_size, self.hash1, self.hash2)
    }
}

/// ssdeep digest of a seekable source holding `len` bytes.
///
/// Returns `Ok(None)` when `len` is below [`SSDEEP_MIN_FILE_SIZE`]. The source
/// is rewound to offset 0 before every pass.
pub fn ssdeep_reader<R: Read + Seek + ?Sized>(reader: &mut R, len: u64) -> Result<Option<String>> {
    if len < SSDEEP_MIN_FILE_SIZE {
        return Ok(None);
    }

    let mut state = FuzzyHashState::new(len);
    loop {
        reader.seek(SeekFrom::Start(0))?;
        if state.block_size < BLOCK_MIN {
            return Err(FingerprintError::BlockSizeTooSmall {
                block_size: state.block_size,
                minimum: BLOCK_MIN,
            });
        }

        state.process(reader)?;

        if state.hash1.len() < SPAMSUM_LENGTH / 2 {
            trace!(
                block_size = state.block_size,
                pieces = state.hash1.len(),
                "Too few pieces; halving block size"
            );
            state.retry_smaller();
        } else {
            break;
        }
    }

    let digest = state.finish();
    debug!(len, digest = %digest, "Computed ssdeep");
    Ok(Some(digest))
}

/// ssdeep digest of an in-memory buffer.
pub fn ssdeep_bytes(data: &[u8]) -> Result<Option<String>> {
    let mut cursor = std::io::Cursor::new(data);
    ssdeep_reader(&mut cursor, data.len() as u64)
}

/// The three fields of an ssdeep digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsdeepDigest {
    pub block_size: u64,
    pub hash1: String,
    pub hash2: String,
}

impl std::fmt::Display for SsdeepDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.block_size, self.hash1, self.hash2)
    }
}

/// Split a digest into its fields.
///
/// `None` unless the block size is `3 * 2^k`, both piece strings use the
/// base64 alphabet, and they hold at most 64 and 32 characters.
pub fn parse_ssdeep(digest: &str) -> Option<SsdeepDigest> {
    let mut parts = digest.splitn(3, ':');
    let block_size: u64 = parts.next()?.parse().ok()?;
    let hash1 = parts.next()?;
    let hash2 = parts.next()?;

    if block_size < BLOCK_MIN || block_size % BLOCK_MIN != 0 || !(block_size / BLOCK_MIN).is_power_of_two() {
        return None;
    }
    let valid = |s: &str, max: usize| s.len() <= max && s.bytes().all(|b| B64.contains(&b));
    if !valid(hash1, SPAMSUM_LENGTH) || !valid(hash2, SPAMSUM_LENGTH / 2) {
        return None;
    }

    Some(SsdeepDigest {
        block_size,
        hash1: hash1.to_string(),
        hash2: hash2.to_string(),
    })
}
