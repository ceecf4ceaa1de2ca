use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use skylift_cloud::ResourceGraph;

use super::pipeline::Pipeline;

/// Build every resource graph and print it as JSON keyed by stack name.
///
/// Packages SSR apps on the way (the graph needs the archive path) but never
/// reaches the backend.
pub async fn plan(out: Option<&Path>) -> anyhow::Result<()> {
    let pipeline = Pipeline::load(Path::new("."))?;
    let preparation = pipeline.prepare().await?;
    preparation.ensure_complete()?;

    let graphs: BTreeMap<String, &ResourceGraph> = preparation
        .prepared
        .iter()
        .map(|p| (p.app.stack_name(), &p.graph))
        .collect();
    let json = serde_json::to_string_pretty(&graphs).context("failed to serialize plan")?;

    match out {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("failed to write plan to {}", path.display()))?;
            eprintln!("Plan for {} stack(s) written to {}", graphs.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
