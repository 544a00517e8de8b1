#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = binprint::formats::pe::parse_string_file_info(data);
});
