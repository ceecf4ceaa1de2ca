#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("provisioning backend '{program}' not found — set [backend] command in skylift.toml")]
    NotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("backend command failed: {program} {args:?}\n{stderr}")]
    CommandFailed {
        program: String,
        args: Vec<String>,
        stderr: String,
    },

    #[error("backend output was not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },

    #[error("failed to write to backend stdin")]
    StdinWrite { source: std::io::Error },
}
