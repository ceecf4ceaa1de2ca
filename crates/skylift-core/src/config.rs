use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::BuildMode;

/// Name of the configuration file looked up in the project directory.
pub const CONFIG_FILE: &str = "skylift.toml";

/// skylift.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkyliftConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub compute: ComputeConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub apps: Vec<AppConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Deployment environment, appended to every logical resource id
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Cloud region the public bucket address is derived from
    #[serde(default = "default_region")]
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Where per-app archives are written
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// Vendored compatibility shim tree copied into every SSR bundle
    #[serde(default = "default_shim_dir")]
    pub shim_dir: PathBuf,
    /// Package name of the shim; also its location under `node_modules/`
    #[serde(default = "default_shim_package")]
    pub shim_package: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeConfig {
    /// Memory allocation in MB
    #[serde(default = "default_memory_mb")]
    pub memory_mb: u32,
    /// Invocation timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u32,
    /// Function runtime identifier
    #[serde(default = "default_runtime")]
    pub runtime: String,
    /// Exported handler of the entry point
    #[serde(default = "default_handler")]
    pub handler: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Variables that receive the public bucket base URL
    #[serde(default = "default_cdn_vars")]
    pub cdn_vars: Vec<String>,
    /// Variable set to "true" inside the function runtime
    #[serde(default = "default_faas_flag")]
    pub faas_flag: String,
    /// Optional dotenv file, relative to each app directory
    #[serde(default)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Executable the provisioning backend is reached through
    #[serde(default = "default_backend_command")]
    pub command: String,
}

/// One `[[apps]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application directory (relative to the project directory)
    pub dir: PathBuf,
    #[serde(default)]
    pub mode: BuildMode,
    /// App name (defaults to the last segment of `dir`)
    pub name: Option<String>,
    /// Website bucket name (SSG/SPA)
    pub bucket: Option<String>,
    /// CDN bucket name (SSR)
    pub public_bucket: Option<String>,
    /// Private bucket holding the zipped build (SSR)
    pub artifact_bucket: Option<String>,
    /// Custom domain served by the HTTP entry point (SSR)
    pub hostname: Option<String>,
    /// Certificate for `hostname`
    pub certificate_arn: Option<String>,
    /// Application variables passed through to the function verbatim
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            region: default_region(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            shim_dir: default_shim_dir(),
            shim_package: default_shim_package(),
        }
    }
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            memory_mb: default_memory_mb(),
            timeout_secs: default_timeout_secs(),
            runtime: default_runtime(),
            handler: default_handler(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cdn_vars: default_cdn_vars(),
            faas_flag: default_faas_flag(),
            env_file: None,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: default_backend_command(),
        }
    }
}

impl AppConfig {
    /// Name used for resource ids and the build output folder.
    pub fn app_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match self.dir.file_name() {
            Some(segment) => segment.to_string_lossy().into_owned(),
            None => "app".to_owned(),
        }
    }
}

impl SkyliftConfig {
    /// Load from skylift.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            let config: Self = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!(path = %config_path.display(), "no config file; using defaults");
            Ok(Self::default())
        }
    }

    /// Check ranges and app-name uniqueness.
    pub fn validate(&self) -> crate::Result<()> {
        if !(128..=10_240).contains(&self.compute.memory_mb) {
            return Err(crate::Error::InvalidConfig {
                reason: format!(
                    "compute.memory_mb must be within 128..=10240, got {}",
                    self.compute.memory_mb
                ),
            });
        }
        if !(1..=900).contains(&self.compute.timeout_secs) {
            return Err(crate::Error::InvalidConfig {
                reason: format!(
                    "compute.timeout_secs must be within 1..=900, got {}",
                    self.compute.timeout_secs
                ),
            });
        }
        if self.project.environment.is_empty() {
            return Err(crate::Error::InvalidConfig {
                reason: "project.environment must not be empty".to_owned(),
            });
        }

        let mut seen = HashSet::new();
        for app in &self.apps {
            let name = app.app_name();
            if !seen.insert(name.clone()) {
                return Err(crate::Error::InvalidConfig {
                    reason: format!("duplicate app name '{name}'; set [[apps]].name to disambiguate"),
                });
            }
        }
        Ok(())
    }

    /// Like [`validate`](Self::validate), and additionally requires at least one app.
    pub fn require_apps(&self) -> crate::Result<&[AppConfig]> {
        if self.apps.is_empty() {
            return Err(crate::Error::InvalidConfig {
                reason: format!("no [[apps]] declared in {CONFIG_FILE}"),
            });
        }
        Ok(&self.apps)
    }
}

fn default_environment() -> String {
    "development".to_owned()
}

fn default_region() -> String {
    "us-east-1".to_owned()
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(".skylift").join("build")
}

fn default_shim_dir() -> PathBuf {
    PathBuf::from("node_modules")
        .join("@vendia")
        .join("serverless-express")
}

fn default_shim_package() -> String {
    "@vendia/serverless-express".to_owned()
}

fn default_memory_mb() -> u32 {
    512
}

fn default_timeout_secs() -> u32 {
    10
}

fn default_runtime() -> String {
    "nodejs18.x".to_owned()
}

fn default_handler() -> String {
    "index.handler".to_owned()
}

fn default_cdn_vars() -> Vec<String> {
    vec![
        "NULLSTACK_WORKER_CDN".to_owned(),
        "NULLSTACK_PUBLIC_CDN".to_owned(),
    ]
}

fn default_faas_flag() -> String {
    "LAMBDA".to_owned()
}

fn default_backend_command() -> String {
    "skylift-backend".to_owned()
}
