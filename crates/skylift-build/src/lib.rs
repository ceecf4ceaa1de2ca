//! Build-tree enumeration, entry-point generation, and bundle packaging.
//!
//! # Packaging pipeline (SSR)
//!
//! ```text
//! skylift package
//!   1. Preconditions ── <app>/.production, <app>/public, shim tree exist
//!   2. Plan          ── index.js + .production/** (no maps) + public/** + node_modules/<shim>/**
//!   3. build.zip     ── <out_dir>/<app>/build.zip (temp file, then rename)
//!   4. dist archive  ── <out_dir>/<app>.zip containing build.zip
//! ```
//!
//! # Static uploads (SSG / SPA, and SSR public assets)
//!
//! [`FileSet`] walks the mode-specific subtree; [`upload::plan_uploads`]
//! turns each file into an [`ObjectUpload`](skylift_core::ObjectUpload) with a
//! bucket-root-relative key, a content type, and a path fingerprint used as a
//! stable resource id.

pub mod content_type;
pub mod eject;
pub mod entrypoint;
pub mod enumerate;
pub mod hash;
pub mod package;
pub mod upload;

pub use entrypoint::EntryPointGenerator;
pub use enumerate::{BuildFile, EnumerateError, FileSet};
pub use package::{PackageError, PackagedApp, Packager};
