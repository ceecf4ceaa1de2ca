use std::path::Path;

use skylift_build::EntryPointGenerator;
use skylift_core::BuildMode;

use super::pipeline::Pipeline;

/// Write the generated entry point into each SSR app (or only `only`).
pub async fn eject(only: Option<&str>, force: bool) -> anyhow::Result<()> {
    let pipeline = Pipeline::load(Path::new("."))?;
    let entry_point = EntryPointGenerator::new(&pipeline.config().build.shim_package).render();

    let apps: Vec<_> = match only {
        Some(name) => {
            let app = pipeline
                .apps()
                .iter()
                .find(|a| a.name == name)
                .ok_or_else(|| anyhow::anyhow!("no app named '{name}' in skylift.toml"))?;
            if app.mode() != BuildMode::Ssr {
                anyhow::bail!(
                    "app '{name}' is {} — only SSR apps have an entry point",
                    app.mode()
                );
            }
            vec![app]
        }
        None => pipeline
            .apps()
            .iter()
            .filter(|a| a.mode() == BuildMode::Ssr)
            .collect(),
    };

    if apps.is_empty() {
        anyhow::bail!("no SSR apps declared — nothing to eject");
    }

    for app in apps {
        let path = skylift_build::eject::eject(&app.dir, &entry_point, force)?;
        println!("Ejected entry point to {}", path.display());
    }
    Ok(())
}
