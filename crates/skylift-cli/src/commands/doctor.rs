use std::path::Path;

use skylift_build::{FileSet, Packager};
use skylift_cloud::{AppCheck, BackendClient, CheckResult};
use skylift_core::{BackendConfig, BuildMode, CONFIG_FILE, SkyliftConfig};

/// Report readiness without stopping at the first problem.
pub async fn doctor() -> anyhow::Result<()> {
    let project_dir = Path::new(".");

    let (config, config_check) = match SkyliftConfig::load(project_dir) {
        Ok(config) if project_dir.join(CONFIG_FILE).exists() => {
            (Some(config), CheckResult::ok("Found"))
        }
        Ok(_) => (None, CheckResult::fail("Not found — run `skylift init`")),
        Err(e) => (None, CheckResult::fail(&format!("{e:#}"))),
    };

    let command = match &config {
        Some(config) => config.backend.command.clone(),
        None => BackendConfig::default().command,
    };
    let mut report = BackendClient::new(command).doctor().await;
    report.config_file = config_check;

    match &config {
        Some(config) => {
            let packager = Packager::new(&config.build, project_dir);
            let needs_shim = config.apps.iter().any(|a| a.mode == BuildMode::Ssr);
            report.shim = if packager.shim_dir().is_dir() {
                CheckResult::ok(&packager.shim_dir().display().to_string())
            } else if needs_shim {
                CheckResult::fail(&format!("{} missing", packager.shim_dir().display()))
            } else {
                CheckResult::ok("not needed (no SSR apps)")
            };

            for app in &config.apps {
                report.apps.push(check_app(project_dir, config, app));
            }
        }
        None => report.shim = CheckResult::fail("skipped — no usable config"),
    }

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed — see above for details");
    }

    Ok(())
}

fn check_app(
    project_dir: &Path,
    config: &SkyliftConfig,
    app: &skylift_core::AppConfig,
) -> AppCheck {
    let name = app.app_name();
    let result = match app.resolve(project_dir, &config.project, &config.runtime) {
        Ok(resolved) => match FileSet::new(&resolved.dir, resolved.mode()) {
            Ok(_) => CheckResult::ok(&format!("{} output present", resolved.mode())),
            Err(e) => CheckResult::fail(&e.to_string()),
        },
        Err(e) => CheckResult::fail(&e.to_string()),
    };
    AppCheck { name, result }
}
