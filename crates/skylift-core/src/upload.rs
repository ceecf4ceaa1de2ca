use std::path::PathBuf;

use serde::Serialize;

/// One file to be placed in a public bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectUpload {
    /// Digest of the build-relative path; stable across runs
    pub fingerprint: String,
    /// Bucket-root-relative object key
    pub key: String,
    /// File on disk whose bytes become the object
    pub source: PathBuf,
    /// Content type inferred from the extension, when known
    pub content_type: Option<String>,
}
