// src/cli/migrate.rs — Database migration command
//
// Migrations run automatically whenever the store opens. This command shows
// what is applied, applies pending ones explicitly, or undoes the latest.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::infra::paths;
use crate::memory::schema;

/// Show migration status, run pending migrations, or roll back the latest.
pub async fn run_migrate(db: Option<&str>, status_only: bool, rollback: bool) -> anyhow::Result<()> {
    let db_path = db.map(PathBuf::from).unwrap_or_else(paths::db_path);

    if !db_path.exists() && (status_only || rollback) {
        println!("No database found at: {}", db_path.display());
        return Ok(());
    }

    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let conn = Connection::open(&db_path)?;

    if status_only {
        return show_migration_status(&conn, &db_path);
    }
    if rollback {
        return run_rollback(&conn);
    }

    println!("Running database migrations...");
    schema::run_migrations(&conn)?;
    println!("Migrations complete.");
    show_migration_status(&conn, &db_path)
}

/// Applied migrations as (version, name, applied_at). Empty before the
/// first run.
fn applied_migrations(conn: &Connection) -> anyhow::Result<Vec<(u32, String, String)>> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = '_migrations'",
        [],
        |row| row.get(0),
    )?;
    if !table_exists {
        return Ok(Vec::new());
    }

    let mut stmt =
        conn.prepare("SELECT version, name, applied_at FROM _migrations ORDER BY version")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn show_migration_status(conn: &Connection, db_path: &Path) -> anyhow::Result<()> {
    let applied = applied_migrations(conn)?;
    if applied.is_empty() {
        println!("No migrations have been run yet.");
        return Ok(());
    }

    println!("Database: {}", db_path.display());
    println!("Current schema version: {}", schema::current_version(conn)?);
    println!();
    println!("Applied migrations:");
    for (version, name, applied_at) in applied {
        println!("  v{version}: {name} (applied {applied_at})");
    }
    Ok(())
}

fn run_rollback(conn: &Connection) -> anyhow::Result<()> {
    if applied_migrations(conn)?.is_empty() {
        println!("No migrations to roll back.");
        return Ok(());
    }
    match schema::rollback_last(conn)? {
        Some(version) => {
            println!("Rolled back migration v{version}.");
            println!("Run `adreply migrate --status` to verify.");
        }
        None => println!("No migrations to roll back."),
    }
    Ok(())
}
