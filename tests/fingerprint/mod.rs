//! End-to-end tests of the structural hashes over synthesized binaries.

mod aggregate;
