//! # binprint
//!
//! Structural fingerprinting of executables. Derives identity and similarity
//! signatures (ssdeep, imphash, symhash/telfhash input, resource and version
//! info digests) from PE, ELF and Mach-O files.
//!
//! ```no_run
//! use binprint::config::FingerprintConfig;
//! use binprint::fingerprint::{fingerprint_file, Collaborators};
//!
//! binprint::logging::init_tracing();
//! let fp = fingerprint_file("sample.exe", &FingerprintConfig::default(), &Collaborators::default())?;
//! println!("{}", fp.to_json()?);
//! # Ok::<(), binprint::error::FingerprintError>(())
//! ```

pub mod config;
pub mod entropy;
pub mod error;
pub mod fingerprint;
pub mod formats;
pub mod hashing;
pub mod io;
pub mod logging;
pub mod similarity;
pub mod symbols;

pub use config::FingerprintConfig;
pub use error::{FingerprintError, HashComponent, HashError, Result};
pub use fingerprint::{fingerprint_bytes, fingerprint_file, Collaborators, FileFingerprint};
