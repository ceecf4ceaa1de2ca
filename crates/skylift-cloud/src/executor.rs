use crate::backend::BackendError;

/// Abstraction over the provisioning backend command for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait BackendExecutor: Send + Sync {
    /// Run the backend with `args` and capture stdout.
    async fn exec(&self, args: &[String]) -> Result<String, BackendError>;

    /// Run the backend with `args` and `stdin_data` piped to stdin.
    async fn exec_with_stdin(
        &self,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, BackendError>;
}

/// Spawns the configured backend executable.
#[derive(Debug, Clone)]
pub struct RealExecutor {
    program: String,
}

impl RealExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn not_found(&self, source: std::io::Error) -> BackendError {
        BackendError::NotFound {
            program: self.program.clone(),
            source,
        }
    }

    fn finish(&self, args: &[String], output: std::process::Output) -> Result<String, BackendError> {
        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| BackendError::InvalidUtf8 { source: e })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Err(BackendError::CommandFailed {
                program: self.program.clone(),
                args: args.to_vec(),
                stderr,
            })
        }
    }
}

impl BackendExecutor for RealExecutor {
    async fn exec(&self, args: &[String]) -> Result<String, BackendError> {
        use std::process::Stdio;

        let output = tokio::process::Command::new(&self.program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.not_found(e))?;

        self.finish(args, output)
    }

    async fn exec_with_stdin(
        &self,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, BackendError> {
        use std::process::Stdio;
        use tokio::io::AsyncWriteExt;

        let mut child = tokio::process::Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.not_found(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(stdin_data)
                .await
                .map_err(|e| BackendError::StdinWrite { source: e })?;
            stdin
                .shutdown()
                .await
                .map_err(|e| BackendError::StdinWrite { source: e })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.not_found(e))?;

        self.finish(args, output)
    }
}
