#![no_main]
use libfuzzer_sys::fuzz_target;

use binprint::formats::pe::{imphash, ImportDirectory, ParseOptions};

fuzz_target!(|data: &[u8]| {
    let Some((&flags, rest)) = data.split_first() else {
        return;
    };
    let dir = ImportDirectory {
        section_data: rest,
        directory_rva: 0x2000,
        section_rva: 0x2000,
        is_64bit: flags & 1 != 0,
    };
    let _ = imphash(Some(&dir), &ParseOptions::default());
});
