use mockall::mock;
use skylift_cloud::backend::BackendError;
use skylift_cloud::client::{BackendClient, CheckResult, DoctorReport, SubmitError};
use skylift_cloud::executor::BackendExecutor;
use skylift_cloud::graph::ResourceGraph;
use skylift_cloud::resource::{Attr, Expr, ObjectOwnership, Resource, ResourceKind};

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

fn small_graph() -> ResourceGraph {
    let mut graph = ResourceGraph::new();
    graph
        .add(Resource::new(
            "site",
            ResourceKind::Bucket {
                name: Some("my-site".to_owned()),
                force_destroy: true,
                ownership: ObjectOwnership::BucketOwnerEnforced,
            },
        ))
        .unwrap();
    graph
        .output("website_url", Expr::attr("site", Attr::WebsiteEndpoint))
        .unwrap();
    graph
}

fn command_failed(stderr: &str) -> BackendError {
    BackendError::CommandFailed {
        program: "skylift-backend".to_owned(),
        args: vec![],
        stderr: stderr.to_owned(),
    }
}

// ── Version ──

#[tokio::test]
async fn version_returns_first_line() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| args.iter().map(String::as_str).eq(["--version"]))
        .returning(|_| Ok("skylift-backend 1.4.2\nbuilt 2026-01-01\n".to_owned()));

    let client = BackendClient::with_executor(mock);
    assert_eq!(client.version().await.unwrap(), "skylift-backend 1.4.2");
}

// ── Submit ──

#[tokio::test]
async fn submit_pipes_graph_and_parses_outputs() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_with_stdin()
        .withf(|args, stdin| {
            let graph: serde_json::Value = serde_json::from_slice(stdin).unwrap();
            args.iter()
                .map(String::as_str)
                .eq(["apply", "--stack", "docs-prod", "-"])
                && graph["resources"][0]["id"] == "site"
                && graph["resources"][0]["type"] == "bucket"
                && graph["outputs"]["website_url"]["ref"] == "site"
        })
        .times(1)
        .returning(|_, _| {
            Ok(r#"{"outputs": {"website_url": "http://my-site.s3-website-us-east-1.amazonaws.com"}}"#.to_owned())
        });

    let client = BackendClient::with_executor(mock);
    let report = client.submit("docs-prod", &small_graph()).await.unwrap();

    assert_eq!(report.stack, "docs-prod");
    assert_eq!(
        report.outputs["website_url"],
        "http://my-site.s3-website-us-east-1.amazonaws.com"
    );
}

#[tokio::test]
async fn submit_accepts_response_without_outputs() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_with_stdin()
        .returning(|_, _| Ok("{}\n".to_owned()));

    let client = BackendClient::with_executor(mock);
    let report = client.submit("docs-prod", &small_graph()).await.unwrap();
    assert!(report.outputs.is_empty());
}

#[tokio::test]
async fn submit_passes_backend_failure_through() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_with_stdin()
        .returning(|_, _| Err(command_failed("AccessDenied: not allowed to create bucket")));

    let client = BackendClient::with_executor(mock);
    let err = client.submit("docs-prod", &small_graph()).await.unwrap_err();

    match &err {
        SubmitError::Apply { stack, source } => {
            assert_eq!(stack, "docs-prod");
            assert!(source.to_string().contains("AccessDenied: not allowed to create bucket"));
        }
        other => panic!("expected Apply, got {other}"),
    }
}

#[tokio::test]
async fn submit_rejects_garbage_response() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_with_stdin()
        .returning(|_, _| Ok("applied!".to_owned()));

    let client = BackendClient::with_executor(mock);
    let err = client.submit("docs-prod", &small_graph()).await.unwrap_err();
    assert!(matches!(err, SubmitError::InvalidResponse { .. }));
}

// ── Doctor ──

#[tokio::test]
async fn doctor_reports_backend_version() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .returning(|_| Ok("skylift-backend 1.4.2\n".to_owned()));

    let client = BackendClient::with_executor(mock);
    let report = client.doctor().await;

    assert!(report.backend.passed);
    assert_eq!(report.backend.detail, "skylift-backend 1.4.2");
}

#[tokio::test]
async fn doctor_reports_missing_backend() {
    let mut mock = MockExecutor::new();
    mock.expect_exec().returning(|_| {
        Err(BackendError::NotFound {
            program: "skylift-backend".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        })
    });

    let client = BackendClient::with_executor(mock);
    let report = client.doctor().await;

    assert!(!report.backend.passed);
    assert!(report.backend.detail.contains("skylift-backend"));
    assert!(!report.all_passed());
}

#[test]
fn doctor_report_requires_every_check() {
    let mut report = DoctorReport {
        backend: CheckResult::ok("1.0"),
        config_file: CheckResult::ok("skylift.toml"),
        shim: CheckResult::ok("node_modules/@vendia/serverless-express"),
        apps: vec![],
    };
    assert!(report.all_passed());

    report.apps.push(skylift_cloud::AppCheck {
        name: "web".to_owned(),
        result: CheckResult::fail("web/.production missing"),
    });
    assert!(!report.all_passed());
    assert_eq!(report.apps[0].result.icon(), "NG");

    let rendered = report.to_string();
    assert!(rendered.contains("App web"));
    assert!(rendered.contains("web/.production missing"));
    assert!(rendered.ends_with("Some checks failed."));
}
