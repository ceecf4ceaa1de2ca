mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "skylift",
    about = "Package and deploy SSR, SSG and SPA web apps to serverless infrastructure"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default skylift.toml
    Init,
    /// Package every SSR app into its deployable archives
    Package,
    /// Build every resource graph and print it without submitting
    Plan {
        /// Write the graphs to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Package, plan and submit every app to the provisioning backend
    Deploy,
    /// Write the generated entry point to <app>/.skylift/index.js
    Eject {
        /// Only eject this app (default: every SSR app)
        app: Option<String>,
        /// Overwrite an existing ejected entry point
        #[arg(long)]
        force: bool,
    },
    /// Check backend, shim and build output readiness
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                // arch-lint: allow(no-silent-result-drop) reason="unset or malformed RUST_LOG falls back to the info level"
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => commands::init_project().await?,
        Commands::Package => commands::package().await?,
        Commands::Plan { out } => commands::plan(out.as_deref()).await?,
        Commands::Deploy => commands::deploy().await?,
        Commands::Eject { app, force } => commands::eject(app.as_deref(), force).await?,
        Commands::Doctor => commands::doctor().await?,
    }

    Ok(())
}
