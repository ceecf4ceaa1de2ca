use std::collections::BTreeMap;

use serde::Deserialize;

use crate::backend::BackendError;
use crate::executor::{BackendExecutor, RealExecutor};
use crate::graph::ResourceGraph;

/// Provisioning backend client, parameterized over the executor for testability.
pub struct BackendClient<E: BackendExecutor = RealExecutor> {
    executor: E,
}

impl BackendClient<RealExecutor> {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            executor: RealExecutor::new(program),
        }
    }
}

impl<E: BackendExecutor> BackendClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── Version ──

    /// First line of `<backend> --version`.
    pub async fn version(&self) -> Result<String, BackendError> {
        let output = self.executor.exec(&args(["--version"])).await?;
        match output.lines().next() {
            Some(line) => Ok(line.trim().to_owned()),
            None => Ok(String::new()),
        }
    }

    // ── Doctor ──

    /// Backend checks of the diagnostic report. The remaining checks are
    /// local and filled in by the caller.
    pub async fn doctor(&self) -> DoctorReport {
        let mut report = DoctorReport::default();

        match self.version().await {
            Ok(v) if !v.is_empty() => report.backend = CheckResult::ok(&v),
            Ok(_) => report.backend = CheckResult::ok("reachable (no version reported)"),
            Err(e) => report.backend = CheckResult::fail(&e.to_string()),
        }

        report
    }

    // ── Apply ──

    /// Submit `graph` as stack `stack` and wait for the backend to apply it.
    ///
    /// The graph is piped as JSON to `<backend> apply --stack <stack> -`; the
    /// backend answers with `{"outputs": {...}}`.
    pub async fn submit(
        &self,
        stack: &str,
        graph: &ResourceGraph,
    ) -> Result<SubmitReport, SubmitError> {
        let payload = serde_json::to_vec(graph).map_err(|e| SubmitError::Serialize {
            stack: stack.to_owned(),
            source: e,
        })?;

        tracing::debug!(stack, resources = graph.len(), bytes = payload.len(), "submitting graph");

        let stdout = self
            .executor
            .exec_with_stdin(&args(["apply", "--stack", stack, "-"]), &payload)
            .await
            .map_err(|e| SubmitError::Apply {
                stack: stack.to_owned(),
                source: e,
            })?;

        let response: ApplyResponse =
            serde_json::from_str(stdout.trim()).map_err(|e| SubmitError::InvalidResponse {
                stack: stack.to_owned(),
                source: e,
            })?;

        tracing::info!(stack, outputs = response.outputs.len(), "stack applied");

        Ok(SubmitReport {
            stack: stack.to_owned(),
            outputs: response.outputs,
        })
    }
}

// ── Helper ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

#[derive(Debug, Deserialize)]
struct ApplyResponse {
    #[serde(default)]
    outputs: BTreeMap<String, String>,
}

/// Result of one applied stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    pub stack: String,
    /// Resolved graph outputs (`invoke_url`, `website_url`, ...)
    pub outputs: BTreeMap<String, String>,
}

// ── Doctor types ──

#[derive(Debug, Default)]
pub struct DoctorReport {
    pub backend: CheckResult,
    pub config_file: CheckResult,
    pub shim: CheckResult,
    pub apps: Vec<AppCheck>,
}

impl DoctorReport {
    pub fn all_passed(&self) -> bool {
        self.backend.passed
            && self.config_file.passed
            && self.shim.passed
            && self.apps.iter().all(|a| a.result.passed)
    }
}

impl std::fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rule = "-".repeat(48);
        writeln!(f, "skylift doctor")?;
        writeln!(f, "{rule}")?;
        write_check(f, "Backend", &self.backend)?;
        write_check(f, "Config file", &self.config_file)?;
        write_check(f, "Shim", &self.shim)?;
        for app in &self.apps {
            write_check(f, &format!("App {}", app.name), &app.result)?;
        }
        writeln!(f, "{rule}")?;
        if self.all_passed() {
            write!(f, "All checks passed.")
        } else {
            write!(f, "Some checks failed.")
        }
    }
}

fn write_check(f: &mut std::fmt::Formatter<'_>, label: &str, check: &CheckResult) -> std::fmt::Result {
    writeln!(f, "{label:<16}{:<4}{}", check.icon(), check.detail)
}

#[derive(Debug, Default, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

/// Build output check of one application.
#[derive(Debug, Clone)]
pub struct AppCheck {
    pub name: String,
    pub result: CheckResult,
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("failed to serialize resource graph for stack '{stack}'")]
    Serialize {
        stack: String,
        source: serde_json::Error,
    },

    #[error("backend failed to apply stack '{stack}'")]
    Apply { stack: String, source: BackendError },

    #[error("backend returned an unreadable response for stack '{stack}'")]
    InvalidResponse {
        stack: String,
        source: serde_json::Error,
    },
}
