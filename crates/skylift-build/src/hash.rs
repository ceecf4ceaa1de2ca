//! Path fingerprints for per-file resource ids.

use sha2::{Digest, Sha256};

/// Length of a [`fingerprint`] in hex characters.
pub const FINGERPRINT_LEN: usize = 64;

/// SHA-256 of a build-relative path, hex encoded.
///
/// Hashes the path, not the file contents: an unchanged file set yields the
/// same resource ids on every run, and renaming a file yields a new id.
pub fn fingerprint(relative_path: &str) -> String {
    hex::encode(Sha256::digest(relative_path.as_bytes()))
}
