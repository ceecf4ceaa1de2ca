//! Deployment orchestration shared by `package`, `plan` and `deploy`.
//!
//! ```text
//! 1. Package   ── every SSR app concurrently, one blocking task each
//! 2. Prepare   ── enumerate uploads, build each app's resource graph
//! 3. Submit    ── only when 1 and 2 succeeded for every app, in config order
//! ```
//!
//! Steps 1 and 2 are local. Archives written by successful packaging stay on
//! disk even when another app fails; only submission is all-or-nothing.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use skylift_build::enumerate::FileSet;
use skylift_build::upload::plan_uploads;
use skylift_build::{PackageError, PackagedApp, Packager};
use skylift_cloud::{BackendClient, BackendExecutor, Provisioner, ResourceGraph, SubmitReport};
use skylift_core::{App, BuildMode, SkyliftConfig};
use tokio::task::JoinSet;

/// Packaging result of one SSR app.
pub(crate) struct PackageOutcome {
    pub app: String,
    pub result: Result<PackagedApp, PackageError>,
}

/// An app whose local steps all succeeded.
pub(crate) struct PreparedApp {
    pub app: App,
    pub graph: ResourceGraph,
}

pub(crate) struct AppFailure {
    pub app: String,
    pub error: anyhow::Error,
}

/// Outcome of the local steps for every app.
#[derive(Default)]
pub(crate) struct Preparation {
    pub prepared: Vec<PreparedApp>,
    pub failures: Vec<AppFailure>,
}

impl Preparation {
    /// Fail with a per-app summary unless every app was prepared.
    pub fn ensure_complete(&self) -> anyhow::Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        let details = self
            .failures
            .iter()
            .map(|f| format!("  {}: {:#}", f.app, f.error))
            .collect::<Vec<_>>()
            .join("\n");
        anyhow::bail!(
            "{} of {} app(s) failed; nothing was submitted\n{details}",
            self.failures.len(),
            self.failures.len() + self.prepared.len()
        );
    }
}

pub(crate) struct Pipeline {
    config: SkyliftConfig,
    apps: Vec<App>,
    packager: Packager,
    provisioner: Provisioner,
}

impl Pipeline {
    /// Load `skylift.toml` from `project_dir` and resolve every app.
    pub fn load(project_dir: &Path) -> anyhow::Result<Self> {
        let config = SkyliftConfig::load(project_dir)?;
        Self::new(project_dir, config)
    }

    pub fn new(project_dir: &Path, config: SkyliftConfig) -> anyhow::Result<Self> {
        let apps = config
            .require_apps()?
            .iter()
            .map(|app| app.resolve(project_dir, &config.project, &config.runtime))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            packager: Packager::new(&config.build, project_dir),
            provisioner: Provisioner::new(&config),
            apps,
            config,
        })
    }

    pub fn config(&self) -> &SkyliftConfig {
        &self.config
    }

    pub fn apps(&self) -> &[App] {
        &self.apps
    }

    // ── Package ──

    /// Package every SSR app concurrently. Results follow config order.
    pub async fn package_all(&self) -> anyhow::Result<Vec<PackageOutcome>> {
        let mut tasks = JoinSet::new();
        for (index, app) in self.apps.iter().enumerate() {
            if app.mode() != BuildMode::Ssr {
                continue;
            }
            let packager = self.packager.clone();
            let name = app.name.clone();
            let dir = app.dir.clone();
            tasks.spawn_blocking(move || {
                let result = packager.package(&name, &dir);
                (index, PackageOutcome { app: name, result })
            });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            outcomes.push(joined.context("packaging task panicked")?);
        }
        outcomes.sort_by_key(|(index, _)| *index);
        Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
    }

    // ── Prepare ──

    /// Package, plan uploads and build the graph of every app. Never submits.
    pub async fn prepare(&self) -> anyhow::Result<Preparation> {
        let mut packaged: HashMap<String, Result<PackagedApp, PackageError>> = self
            .package_all()
            .await?
            .into_iter()
            .map(|outcome| (outcome.app, outcome.result))
            .collect();

        let mut preparation = Preparation::default();
        for app in &self.apps {
            let artifact = match packaged.remove(&app.name) {
                Some(Ok(packaged)) => Some(packaged.dist_archive),
                Some(Err(e)) => {
                    tracing::warn!(app = %app.name, error = %e, "packaging failed");
                    preparation.failures.push(AppFailure {
                        app: app.name.clone(),
                        error: e.into(),
                    });
                    continue;
                }
                None => None,
            };

            match self.plan_app(app, artifact.as_deref()) {
                Ok(graph) => preparation.prepared.push(PreparedApp {
                    app: app.clone(),
                    graph,
                }),
                Err(error) => {
                    tracing::warn!(app = %app.name, error = %error, "planning failed");
                    preparation.failures.push(AppFailure {
                        app: app.name.clone(),
                        error,
                    });
                }
            }
        }
        Ok(preparation)
    }

    fn plan_app(&self, app: &App, artifact: Option<&Path>) -> anyhow::Result<ResourceGraph> {
        let files = FileSet::new(&app.dir, app.mode())?;
        let uploads = plan_uploads(&files)?;
        Ok(self.provisioner.provision(app, &uploads, artifact)?)
    }

    // ── Deploy ──

    /// Prepare every app, then submit each graph in config order.
    ///
    /// Nothing is submitted unless every app was prepared. A backend failure
    /// stops further submissions.
    pub async fn deploy<E: BackendExecutor>(
        &self,
        client: &BackendClient<E>,
    ) -> anyhow::Result<Vec<SubmitReport>> {
        let preparation = self.prepare().await?;
        preparation.ensure_complete()?;

        let mut reports = Vec::with_capacity(preparation.prepared.len());
        for prepared in &preparation.prepared {
            let stack = prepared.app.stack_name();
            tracing::info!(app = %prepared.app.name, stack = %stack, "submitting");
            let report = client
                .submit(&stack, &prepared.graph)
                .await
                .with_context(|| format!("deploy of '{}' failed", prepared.app.name))?;
            reports.push(report);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::{Sequence, mock};
    use skylift_cloud::BackendError;
    use tempfile::TempDir;

    mock! {
        Executor {}

        impl BackendExecutor for Executor {
            async fn exec(&self, args: &[String]) -> Result<String, BackendError>;
            async fn exec_with_stdin(
                &self,
                args: &[String],
                stdin_data: &[u8],
            ) -> Result<String, BackendError>;
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn built_ssr(root: &Path, dir: &str) {
        write(root, &format!("{dir}/public/index.html"), "<html></html>");
        write(root, &format!("{dir}/.production/server.js"), "exports.default = {};");
        write(root, &format!("{dir}/.production/client.js"), "1");
        write(root, &format!("{dir}/.production/client.css"), "a{}");
    }

    /// Project with the shim installed and the given `[[apps]]` blocks.
    fn project(apps: &str) -> TempDir {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "node_modules/@vendia/serverless-express/index.js",
            "module.exports = () => {};",
        );
        write(
            tmp.path(),
            "skylift.toml",
            &format!("[project]\nenvironment = \"dev\"\n\n{apps}"),
        );
        tmp
    }

    const THREE_SSR: &str = r#"
[[apps]]
dir = "a"

[[apps]]
dir = "b"

[[apps]]
dir = "c"
"#;

    fn applied() -> Result<String, BackendError> {
        Ok(r#"{"outputs": {"invoke_url": "https://abc.execute-api.us-east-1.amazonaws.com"}}"#.to_owned())
    }

    #[tokio::test]
    async fn unbuilt_app_blocks_every_submission() {
        let tmp = project(THREE_SSR);
        built_ssr(tmp.path(), "a");
        built_ssr(tmp.path(), "b");
        write(tmp.path(), "c/public/index.html", "<html></html>");

        let mut mock = MockExecutor::new();
        mock.expect_exec_with_stdin().times(0);
        let client = BackendClient::with_executor(mock);

        let pipeline = Pipeline::load(tmp.path()).unwrap();
        let err = pipeline.deploy(&client).await.unwrap_err();
        let message = format!("{err:#}");

        assert!(message.contains("1 of 3 app(s) failed"), "{message}");
        assert!(message.contains("c: application is not built"), "{message}");

        let out = tmp.path().join(".skylift/build");
        assert!(out.join("a.zip").is_file());
        assert!(out.join("a/build.zip").is_file());
        assert!(out.join("b.zip").is_file());
        assert!(!out.join("c.zip").exists());
        assert!(!out.join("c").exists());
    }

    #[tokio::test]
    async fn complete_batch_submits_in_config_order() {
        let tmp = project(
            r#"
[[apps]]
dir = "a"

[[apps]]
dir = "b"

[[apps]]
dir = "docs"
mode = "ssg"
"#,
        );
        built_ssr(tmp.path(), "a");
        built_ssr(tmp.path(), "b");
        write(tmp.path(), "docs/ssg/index.html", "docs");

        let mut mock = MockExecutor::new();
        let mut seq = Sequence::new();
        for stack in ["a-dev", "b-dev", "docs-dev"] {
            mock.expect_exec_with_stdin()
                .withf(move |args, _| args.len() == 4 && args[2] == stack)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| applied());
        }
        let client = BackendClient::with_executor(mock);

        let pipeline = Pipeline::load(tmp.path()).unwrap();
        let reports = pipeline.deploy(&client).await.unwrap();

        let stacks: Vec<&str> = reports.iter().map(|r| r.stack.as_str()).collect();
        assert_eq!(stacks, vec!["a-dev", "b-dev", "docs-dev"]);
        assert_eq!(
            reports[0].outputs["invoke_url"],
            "https://abc.execute-api.us-east-1.amazonaws.com"
        );
    }

    #[tokio::test]
    async fn backend_failure_stops_remaining_submissions() {
        let tmp = project(THREE_SSR);
        for dir in ["a", "b", "c"] {
            built_ssr(tmp.path(), dir);
        }

        let mut mock = MockExecutor::new();
        mock.expect_exec_with_stdin().times(1).returning(|_, _| {
            Err(BackendError::CommandFailed {
                program: "skylift-backend".to_owned(),
                args: vec![],
                stderr: "BucketAlreadyExists".to_owned(),
            })
        });
        let client = BackendClient::with_executor(mock);

        let pipeline = Pipeline::load(tmp.path()).unwrap();
        let err = pipeline.deploy(&client).await.unwrap_err();
        let message = format!("{err:#}");

        assert!(message.contains("deploy of 'a' failed"), "{message}");
        assert!(message.contains("BucketAlreadyExists"), "{message}");
    }

    #[tokio::test]
    async fn package_all_skips_static_apps_and_keeps_order() {
        let tmp = project(
            r#"
[[apps]]
dir = "site"
mode = "spa"

[[apps]]
dir = "b"

[[apps]]
dir = "a"
"#,
        );
        built_ssr(tmp.path(), "a");
        built_ssr(tmp.path(), "b");

        let pipeline = Pipeline::load(tmp.path()).unwrap();
        let outcomes = pipeline.package_all().await.unwrap();

        let names: Vec<&str> = outcomes.iter().map(|o| o.app.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
    }

    #[tokio::test]
    async fn prepare_reports_missing_static_output() {
        let tmp = project(
            r#"
[[apps]]
dir = "docs"
mode = "ssg"
"#,
        );
        write(tmp.path(), "docs/spa/index.html", "wrong folder");

        let pipeline = Pipeline::load(tmp.path()).unwrap();
        let preparation = pipeline.prepare().await.unwrap();

        assert!(preparation.prepared.is_empty());
        assert_eq!(preparation.failures.len(), 1);
        assert!(preparation.ensure_complete().is_err());
    }

    #[tokio::test]
    async fn prepare_builds_one_object_per_static_file() {
        let tmp = project(
            r#"
[[apps]]
dir = "docs"
mode = "ssg"
"#,
        );
        write(tmp.path(), "docs/ssg/index.html", "home");
        write(tmp.path(), "docs/ssg/about/index.html", "about");
        write(tmp.path(), "docs/ssg/app.js.map", "{}");

        let pipeline = Pipeline::load(tmp.path()).unwrap();
        let preparation = pipeline.prepare().await.unwrap();
        preparation.ensure_complete().unwrap();

        let graph = &preparation.prepared[0].graph;
        let objects = graph
            .filter(|k| matches!(k, skylift_cloud::ResourceKind::BucketObject { .. }))
            .count();
        assert_eq!(objects, 3);
        assert!(!tmp.path().join(".skylift").exists());
    }

    #[test]
    fn empty_project_is_rejected() {
        let tmp = project("");
        let err = Pipeline::load(tmp.path()).err().unwrap();
        assert!(err.to_string().contains("no [[apps]]"));
    }
}
