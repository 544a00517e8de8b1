//! Bounds-checked reads and RVA translation shared by the PE parsers

use crate::formats::pe::types::{PeError, Result};

/// Extension trait for reading primitive types from byte slices
pub trait ReadExt {
    fn read_u16_le_at(&self, offset: usize) -> Option<u16>;
    fn read_u32_le_at(&self, offset: usize) -> Option<u32>;
    fn read_u64_le_at(&self, offset: usize) -> Option<u64>;
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]>;
}

impl ReadExt for [u8] {
    #[inline(always)]
    fn read_u16_le_at(&self, offset: usize) -> Option<u16> {
        self.get(offset..offset.checked_add(2)?)
            .and_then(|b| b.try_into().ok())
            .map(u16::from_le_bytes)
    }

    #[inline(always)]
    fn read_u32_le_at(&self, offset: usize) -> Option<u32> {
        self.get(offset..offset.checked_add(4)?)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
    }

    #[inline(always)]
    fn read_u64_le_at(&self, offset: usize) -> Option<u64> {
        self.get(offset..offset.checked_add(8)?)
            .and_then(|b| b.try_into().ok())
            .map(u64::from_le_bytes)
    }

    #[inline(always)]
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.get(offset..offset.checked_add(len)?)
    }
}

/// Read a little-endian u16, failing with a truncation error
pub fn u16_at(data: &[u8], offset: usize) -> Result<u16> {
    data.read_u16_le_at(offset)
        .ok_or_else(|| truncated(data, offset, 2))
}

/// Read a little-endian u32, failing with a truncation error
pub fn u32_at(data: &[u8], offset: usize) -> Result<u32> {
    data.read_u32_le_at(offset)
        .ok_or_else(|| truncated(data, offset, 4))
}

/// Read a little-endian u64, failing with a truncation error
pub fn u64_at(data: &[u8], offset: usize) -> Result<u64> {
    data.read_u64_le_at(offset)
        .ok_or_else(|| truncated(data, offset, 8))
}

/// Borrow `len` bytes at `offset`, failing with a truncation error
pub fn slice_at(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    data.read_slice_at(offset, len)
        .ok_or_else(|| truncated(data, offset, len))
}

fn truncated(data: &[u8], offset: usize, needed: usize) -> PeError {
    PeError::Truncated {
        offset,
        needed,
        available: data.len().saturating_sub(offset),
    }
}

/// Translate an RVA into an offset relative to a section starting at `base_rva`.
///
/// The offset is only guaranteed to be representable; callers still bound
/// every read against the section buffer.
#[inline]
pub fn rva_to_offset(rva: u32, base_rva: u32) -> Result<usize> {
    rva.checked_sub(base_rva)
        .map(|off| off as usize)
        .ok_or(PeError::InvalidRva { rva })
}

/// Read a NUL-terminated ASCII string. An unterminated string is an error.
pub fn read_cstring(data: &[u8], offset: usize) -> Result<&[u8]> {
    let tail = data
        .get(offset..)
        .filter(|t| !t.is_empty())
        .ok_or(PeError::InvalidOffset { offset })?;
    let len = memchr::memchr(0, tail).ok_or(PeError::InvalidString { offset })?;
    Ok(&tail[..len])
}

/// Decode UTF-16LE code units up to the first NUL or the end of the slice.
///
/// A trailing odd byte is ignored; unpaired surrogates decode as U+FFFD.
pub fn read_utf16le(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .take_while(|&w| w != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Number of UTF-16 code units before the first NUL (or the slice end).
pub fn utf16le_units(data: &[u8]) -> usize {
    data.chunks_exact(2)
        .take_while(|b| b[0] != 0 || b[1] != 0)
        .count()
}

/// Align a value up to a multiple of four
#[inline(always)]
pub fn align4(value: usize) -> usize {
    (value + 3) & !3
}
