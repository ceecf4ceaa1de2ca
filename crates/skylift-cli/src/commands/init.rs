use std::path::Path;

use skylift_core::CONFIG_FILE;

const TEMPLATE: &str = r#"[project]
# environment = "development"
# region = "us-east-1"

[build]
# out_dir = ".skylift/build"
# shim_dir = "node_modules/@vendia/serverless-express"

[compute]
# memory_mb = 512
# timeout_secs = 10
# runtime = "nodejs18.x"

[backend]
# command = "skylift-backend"

[[apps]]
dir = "."
mode = "ssr"
# public_bucket = "my-app-public"
# artifact_bucket = "my-app-artifacts"
# hostname = "app.example.com"
# certificate_arn = "arn:aws:acm:us-east-1:123456789012:certificate/..."

# [apps.env]
# API_URL = "https://api.example.com"
"#;

/// Write a default skylift.toml into the current directory.
pub async fn init_project() -> anyhow::Result<()> {
    let path = Path::new(CONFIG_FILE);
    if path.exists() {
        anyhow::bail!("{CONFIG_FILE} already exists — remove it first to start over");
    }

    std::fs::write(path, TEMPLATE)?;
    println!("Created {CONFIG_FILE}");
    println!();
    println!("Next steps:");
    println!("  1. Run the production build of your app");
    println!("  2. Check readiness:  skylift doctor");
    println!("  3. Deploy:           skylift deploy");

    Ok(())
}
