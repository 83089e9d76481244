// src/cli/mod.rs — CLI definition (clap derive)

pub mod learn;
pub mod migrate;
pub mod suggest;
pub mod templates;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::infra::config::Config;
use crate::infra::paths;
use crate::matching::engine::SuggestionEngine;
use crate::memory::backend::Backend;
use crate::memory::retry::{RetryConfig, RetryStore};
use crate::memory::store_server::spawn_store_server;
use crate::memory::MemoryManager;

/// The engine as wired by the binary: SQLite actor behind retry.
pub type CliEngine = SuggestionEngine<RetryStore<Backend>>;

#[derive(Parser)]
#[command(name = "adreply", about = "Keyword-matched ad reply suggestions", version)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Database path (defaults to the data directory)
    #[arg(long, global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Suggest reply templates for a post
    Suggest {
        /// Conversation group the reply goes to
        #[arg(short, long)]
        group: String,
        /// Maximum number of suggestions
        #[arg(short, long)]
        max: Option<usize>,
        /// Post text
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,
    },
    /// Record that a template was posted in a group
    Use {
        #[arg(short, long)]
        group: String,
        #[arg(short, long)]
        template: String,
        /// Variant index that was posted
        #[arg(long, conflicts_with = "base")]
        variant: Option<usize>,
        /// The base text was posted
        #[arg(long)]
        base: bool,
    },
    /// Manage the template library
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },
    /// Keyword learning reports and maintenance
    Learn {
        #[command(subcommand)]
        action: LearnAction,
    },
    /// Show or change the database schema version
    Migrate {
        /// Show applied migrations without changing anything
        #[arg(long)]
        status: bool,
        /// Undo the most recent migration
        #[arg(long, conflicts_with = "status")]
        rollback: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum TemplateAction {
    /// List stored templates
    List {
        /// Only templates tagged with this vertical
        #[arg(long)]
        vertical: Option<String>,
    },
    /// Add or replace templates from a JSON file (one object or an array)
    Add { file: PathBuf },
    /// Remove a template by id
    Remove { id: String },
}

#[derive(Subcommand, Clone)]
pub enum LearnAction {
    /// Keyword performance per category
    Report {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keywords that rarely lead to a chosen suggestion
    Removals {
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        min_matches: Option<u64>,
    },
    /// Recompute every keyword score now
    Recalc,
    /// Delete statistics for categories no template uses
    Prune,
}

/// Open the database, start the store task and build the engine.
pub async fn open_engine(db: Option<&str>, config: Config) -> anyhow::Result<CliEngine> {
    let db_path = match db {
        Some(p) => PathBuf::from(p),
        None => {
            paths::ensure_dirs().await?;
            paths::db_path()
        }
    };

    let manager = MemoryManager::open(&db_path)?;
    let (handle, _server) = spawn_store_server(manager.store);
    tracing::debug!("Store opened at {}", db_path.display());

    let store = RetryStore::with_config(Backend::Sqlite(handle), RetryConfig::from(&config.store));
    Ok(SuggestionEngine::new(Arc::new(store), config))
}
