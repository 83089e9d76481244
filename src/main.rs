// src/main.rs — adreply entry point

use clap::Parser;

use adreply::cli::{self, Cli, Commands};
use adreply::infra::config::Config;
use adreply::infra::logger;

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG)
    logger::init_logging("warn");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    // Opening the engine applies migrations, so this runs before it.
    if let Commands::Migrate { status, rollback } = cli.command {
        return cli::migrate::run_migrate(cli.db.as_deref(), status, rollback).await;
    }

    let engine = cli::open_engine(cli.db.as_deref(), config).await?;

    let result = match cli.command {
        Commands::Suggest { group, max, text } => {
            cli::suggest::run_suggest(&engine, &group, max, &text).await
        }
        Commands::Use {
            group,
            template,
            variant,
            base,
        } => cli::suggest::run_use(&engine, &group, &template, variant, base).await,
        Commands::Templates { action } => cli::templates::run_templates(&engine, action).await,
        Commands::Learn { action } => cli::learn::run_learn(&engine, action).await,
        Commands::Migrate { .. } => Ok(()),
    };

    engine.shutdown();
    result
}
