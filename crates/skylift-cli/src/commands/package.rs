use std::path::Path;

use super::pipeline::Pipeline;

/// Package every SSR app without planning or submitting anything.
pub async fn package() -> anyhow::Result<()> {
    let pipeline = Pipeline::load(Path::new("."))?;

    println!("Packaging...");
    let outcomes = pipeline.package_all().await?;
    if outcomes.is_empty() {
        println!("No SSR apps to package.");
        return Ok(());
    }

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(packaged) => println!(
                "  {}: {} ({} entries)",
                outcome.app,
                packaged.dist_archive.display(),
                packaged.entries
            ),
            Err(e) => {
                failed += 1;
                println!("  {}: FAILED — {e}", outcome.app);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} app(s) failed to package", outcomes.len());
    }
    Ok(())
}
