//! Whole-file fingerprints: file access, limits, configuration and JSON.

use binprint::config::FingerprintConfig;
use binprint::error::FingerprintError;
use binprint::fingerprint::{fingerprint_bytes, fingerprint_file, Collaborators, FileFingerprint};
use binprint::formats::ContainerKind;
use binprint::hashing::{md5_digest, sha1_digest, sha256_digest};
use binprint::io::error::IoError;
use binprint::HashComponent;

use crate::common::create_temp_file;
use crate::common::imports::{build_import_section, Thunk};
use crate::common::lcg_bytes;
use crate::common::pe::{Directory, PeBuilder};

fn pe_with_padding() -> Vec<u8> {
    let builder = PeBuilder::new(false);
    let idata_rva = builder.next_rva();
    let idata = build_import_section(
        &[("USER32.dll", vec![Thunk::Name("MessageBoxA")])],
        idata_rva,
        false,
    );
    builder
        .section(".idata", idata, Directory::Import)
        .section(".data", lcg_bytes(0x3000, 17), Directory::None)
        .build()
}

#[test]
fn test_file_and_bytes_agree() {
    let data = pe_with_padding();
    let temp = create_temp_file(&data);
    let config = FingerprintConfig::default();
    let collaborators = Collaborators::default();

    let from_file = fingerprint_file(temp.path(), &config, &collaborators).unwrap();
    let from_bytes = fingerprint_bytes(&data, &config, &collaborators);
    assert_eq!(from_file, from_bytes);

    assert_eq!(from_file.size, data.len() as u64);
    assert_eq!(from_file.md5, md5_digest(&data));
    assert_eq!(from_file.sha1, sha1_digest(&data));
    assert_eq!(from_file.sha256, sha256_digest(&data));
    assert!(from_file.ssdeep.is_some());
    assert_eq!(from_file.container, ContainerKind::Pe);
    assert!(from_file.is_complete());
}

#[test]
fn test_file_over_limit_is_refused() {
    let temp = create_temp_file(&lcg_bytes(8192, 2));
    let mut config = FingerprintConfig::default();
    config.io.max_file_size = 4096;

    let err = fingerprint_file(temp.path(), &config, &Collaborators::default()).unwrap_err();
    assert!(matches!(
        err,
        FingerprintError::Io(IoError::FileTooLarge {
            limit: 4096,
            found: 8192
        })
    ));
}

#[test]
fn test_missing_file() {
    let result = fingerprint_file(
        "/nonexistent/binprint/sample.bin",
        &FingerprintConfig::default(),
        &Collaborators::default(),
    );
    assert!(matches!(result, Err(FingerprintError::Io(IoError::StdIo(_)))));
}

#[test]
fn test_empty_file() {
    let temp = create_temp_file(&[]);
    let fp = fingerprint_file(temp.path(), &FingerprintConfig::default(), &Collaborators::default())
        .unwrap();
    assert_eq!(fp.size, 0);
    assert_eq!(fp.md5, binprint::hashing::EMPTY_MD5);
    assert_eq!(fp.sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    assert_eq!(fp.ssdeep, None);
    assert!(fp.is_complete());
}

#[test]
fn test_config_toggles() {
    let data = pe_with_padding();
    let config = FingerprintConfig::from_json(
        r#"{"hashes": {"ssdeep": false, "imphash": false, "resources": false}}"#,
    )
    .unwrap();
    assert!(config.hashes.symbols);

    let fp = fingerprint_bytes(&data, &config, &Collaborators::default());
    assert_eq!(fp.ssdeep, None);
    let pe = fp.pe.unwrap();
    assert_eq!(pe.imphash, None);
    assert!(pe.imports.is_empty());
    // Header facts are not gated
    assert_eq!(pe.header.contained_sections, 2);
}

#[test]
fn test_json_output() {
    let data = pe_with_padding();
    let fp = fingerprint_bytes(&data, &FingerprintConfig::default(), &Collaborators::default());
    let json: serde_json::Value = serde_json::from_str(&fp.to_json().unwrap()).unwrap();

    assert_eq!(json["container"], "Pe");
    assert_eq!(json["md5"], md5_digest(&data).as_str());
    assert_eq!(json["sha1"], sha1_digest(&data).as_str());
    assert_eq!(
        json["pe"]["imports"]["user32.dll"],
        serde_json::json!(["MessageBoxA"])
    );
    assert_eq!(
        json["pe"]["imphash"],
        format!("{:032x}", md5::compute("user32.messageboxa")).as_str()
    );
    // Empty sections are omitted
    assert!(json.get("errors").is_none());
    assert!(json.get("elf").is_none());
}

#[test]
fn test_errors_serialize_with_component() {
    let fp = fingerprint_bytes(&vec![0u8; 8192], &FingerprintConfig::default(), &Collaborators::default());
    assert_eq!(fp.errors.len(), 1);
    assert_eq!(fp.errors[0].component, HashComponent::Ssdeep);

    let json = fp.to_json().unwrap();
    let back: FileFingerprint = serde_json::from_str(&json).unwrap();
    assert_eq!(back, fp);
}

#[test]
fn test_truncated_pe_is_recorded() {
    let mut data = pe_with_padding();
    data.truncate(0x180);
    let fp = fingerprint_bytes(&data, &FingerprintConfig::default(), &Collaborators::default());
    assert_eq!(fp.container, ContainerKind::Pe);
    assert!(fp.pe.is_none());
    assert_eq!(fp.errors.len(), 1);
    assert_eq!(fp.errors[0].component, HashComponent::Container);
}
