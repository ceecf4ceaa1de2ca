//! Core types and configuration for skylift.
//!
//! This crate defines the `skylift.toml` schema ([`SkyliftConfig`]), the
//! [`BuildMode`] of an application, the resolved per-app view ([`App`],
//! [`AppTarget`]), and shared error types.

pub mod app;
pub mod config;
pub mod error;
pub mod mode;
pub mod upload;

pub use app::{App, AppEnvironment, AppTarget, BucketSpec, DomainSpec};
pub use config::{
    AppConfig, BackendConfig, BuildConfig, CONFIG_FILE, ComputeConfig, ProjectConfig,
    RuntimeConfig, SkyliftConfig,
};
pub use error::{Error, Result};
pub use mode::BuildMode;
pub use upload::ObjectUpload;
