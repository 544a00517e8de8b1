#![no_main]
use libfuzzer_sys::fuzz_target;

use binprint::{fingerprint_bytes, Collaborators, FingerprintConfig};

fuzz_target!(|data: &[u8]| {
    let _ = fingerprint_bytes(data, &FingerprintConfig::default(), &Collaborators::default());
});
