//! Shannon entropy of section bytes.

/// Calculates the Shannon entropy of a byte slice.
///
/// Returns a value between 0.0 and 8.0, where 0.0 means every byte is the
/// same and 8.0 is a uniform distribution.
#[inline]
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut histogram = [0usize; 256];
    for &byte in data {
        histogram[byte as usize] += 1;
    }

    let len = data.len() as f64;
    let mut entropy = 0.0;
    for &count in &histogram {
        if count == 0 {
            continue;
        }
        let p = (count as f64) / len;
        entropy -= p * p.log2();
    }
    entropy
}

/// Entropy rounded to two decimals, as reported in section summaries.
pub fn rounded_entropy(data: &[u8]) -> f64 {
    (shannon_entropy(data) * 100.0).round() / 100.0
}
