use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("invalid app '{app}': {reason}")]
    InvalidApp { app: String, reason: String },

    #[error("unknown build mode {0:?} (expected ssr, ssg or spa)")]
    UnknownMode(String),

    // ── Application environment ──
    #[error("failed to read env file {path}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
}

impl Error {
    pub(crate) fn invalid_app(app: &str, reason: impl Into<String>) -> Self {
        Self::InvalidApp {
            app: app.to_owned(),
            reason: reason.into(),
        }
    }
}
