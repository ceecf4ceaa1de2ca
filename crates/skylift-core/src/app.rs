//! Resolved, per-deployment view of an `[[apps]]` entry.
//!
//! [`AppConfig`] carries every optional field of every mode; [`App`] replaces
//! that with an [`AppTarget`] whose payload only holds what its mode uses.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{AppConfig, ProjectConfig, RuntimeConfig};
use crate::BuildMode;

/// A storage bucket as the provisioner sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSpec {
    /// Logical id, unique within one resource graph
    pub id: String,
    /// Physical bucket name; `None` lets the backend generate one
    pub name: Option<String>,
}

impl BucketSpec {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }
}

/// Custom hostname for the HTTP entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainSpec {
    pub hostname: String,
    pub certificate_arn: Option<String>,
}

/// Mode-specific deployment shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AppTarget {
    Ssr {
        /// Public CDN bucket for `public/` and the client bundle
        public_bucket: BucketSpec,
        /// Private bucket the zipped build is deployed to
        artifact_bucket: BucketSpec,
        domain: Option<DomainSpec>,
    },
    Ssg {
        site_bucket: BucketSpec,
    },
    Spa {
        site_bucket: BucketSpec,
    },
}

impl AppTarget {
    pub fn mode(&self) -> BuildMode {
        match self {
            Self::Ssr { .. } => BuildMode::Ssr,
            Self::Ssg { .. } => BuildMode::Ssg,
            Self::Spa { .. } => BuildMode::Spa,
        }
    }

    /// The bucket that is readable by everyone.
    pub fn public_bucket(&self) -> &BucketSpec {
        match self {
            Self::Ssr { public_bucket, .. } => public_bucket,
            Self::Ssg { site_bucket } | Self::Spa { site_bucket } => site_bucket,
        }
    }
}

/// Application variables passed opaquely into the function runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AppEnvironment(BTreeMap<String, String>);

impl AppEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a dotenv file. Values are not exported to the current process.
    pub fn from_dotenv(path: &Path) -> crate::Result<Self> {
        let iter = dotenvy::from_path_iter(path).map_err(|e| crate::Error::EnvFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut vars = BTreeMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| crate::Error::EnvFile {
                path: path.to_path_buf(),
                source: e,
            })?;
            vars.insert(key, value);
        }
        Ok(Self(vars))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: &BTreeMap<String, String>) {
        for (k, v) in other {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for AppEnvironment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A fully resolved application ready for packaging and provisioning.
#[derive(Debug, Clone)]
pub struct App {
    pub name: String,
    /// Absolute or project-relative application directory
    pub dir: PathBuf,
    pub environment: String,
    pub target: AppTarget,
    pub env: AppEnvironment,
}

impl App {
    pub fn mode(&self) -> BuildMode {
        self.target.mode()
    }

    /// `<app>-<environment>`, the unit the backend applies.
    pub fn stack_name(&self) -> String {
        format!("{}-{}", self.name, self.environment)
    }
}

impl AppConfig {
    /// Resolve this entry against the project settings.
    ///
    /// Mode-foreign fields are rejected rather than ignored, and the dotenv
    /// file (when configured and present) is merged under the inline `env`.
    pub fn resolve(
        &self,
        project_dir: &Path,
        project: &ProjectConfig,
        runtime: &RuntimeConfig,
    ) -> crate::Result<App> {
        let name = self.app_name();
        let environment = &project.environment;
        let dir = project_dir.join(&self.dir);

        let target = match self.mode {
            BuildMode::Ssr => {
                if self.bucket.is_some() {
                    return Err(crate::Error::invalid_app(
                        &name,
                        "`bucket` is for ssg/spa apps; use `public_bucket` and `artifact_bucket`",
                    ));
                }
                if self.certificate_arn.is_some() && self.hostname.is_none() {
                    return Err(crate::Error::invalid_app(
                        &name,
                        "`certificate_arn` is set but `hostname` is not",
                    ));
                }
                AppTarget::Ssr {
                    public_bucket: BucketSpec::new(
                        format!("{name}-public-bucket-{environment}"),
                        self.public_bucket.clone(),
                    ),
                    artifact_bucket: BucketSpec::new(
                        format!("{name}-artifact-bucket-{environment}"),
                        self.artifact_bucket.clone(),
                    ),
                    domain: self.hostname.clone().map(|hostname| DomainSpec {
                        hostname,
                        certificate_arn: self.certificate_arn.clone(),
                    }),
                }
            }
            BuildMode::Ssg | BuildMode::Spa => {
                let foreign = [
                    ("public_bucket", self.public_bucket.is_some()),
                    ("artifact_bucket", self.artifact_bucket.is_some()),
                    ("hostname", self.hostname.is_some()),
                    ("certificate_arn", self.certificate_arn.is_some()),
                ];
                if let Some((field, _)) = foreign.iter().find(|(_, set)| *set) {
                    return Err(crate::Error::invalid_app(
                        &name,
                        format!("`{field}` only applies to ssr apps"),
                    ));
                }
                let site_bucket = BucketSpec::new(
                    format!("{name}-bucket-{environment}"),
                    self.bucket.clone(),
                );
                if self.mode == BuildMode::Ssg {
                    AppTarget::Ssg { site_bucket }
                } else {
                    AppTarget::Spa { site_bucket }
                }
            }
        };

        let mut env = match &runtime.env_file {
            Some(file) if dir.join(file).is_file() => AppEnvironment::from_dotenv(&dir.join(file))?,
            Some(file) => {
                tracing::warn!(app = %name, file = %file.display(), "env file not found; skipping");
                AppEnvironment::new()
            }
            None => AppEnvironment::new(),
        };
        env.merge(&self.env);

        Ok(App {
            name,
            dir,
            environment: environment.clone(),
            target,
            env,
        })
    }
}
