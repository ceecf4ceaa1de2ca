use std::path::Path;

use skylift_cloud::BackendClient;

use super::pipeline::Pipeline;

/// Execute the full deploy pipeline.
pub async fn deploy() -> anyhow::Result<()> {
    let pipeline = Pipeline::load(Path::new("."))?;
    let client = BackendClient::new(pipeline.config().backend.command.clone());

    println!(
        "Deploying {} app(s) to '{}'...",
        pipeline.apps().len(),
        pipeline.config().project.environment
    );
    let reports = pipeline.deploy(&client).await?;

    for report in &reports {
        println!();
        println!("Deployed: {}", report.stack);
        for (name, value) in &report.outputs {
            println!("  {name:<16}{value}");
        }
    }

    Ok(())
}
