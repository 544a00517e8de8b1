#![no_main]
use libfuzzer_sys::fuzz_target;

use binprint::formats::pe::{walk_resources, ParseOptions, ResourceSection};

fuzz_target!(|data: &[u8]| {
    let section = ResourceSection {
        data,
        virtual_address: 0x1000,
    };
    let _ = walk_resources(&section, &ParseOptions::default());
});
