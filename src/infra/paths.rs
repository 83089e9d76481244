// src/infra/paths.rs — XDG-compliant path management
//
// All paths respect the ADREPLY_HOME environment variable for isolation.
// When ADREPLY_HOME is set, config and data live under that directory.
// When unset, config uses ~/.adreply/ and data uses XDG_DATA_HOME/adreply.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

fn adreply_home() -> Option<PathBuf> {
    std::env::var_os("ADREPLY_HOME").map(PathBuf::from)
}

/// Home directory, or the working directory when none can be determined.
pub fn dirs_home() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $ADREPLY_HOME/ or ~/.adreply/
pub fn config_dir() -> PathBuf {
    if let Some(home) = adreply_home() {
        return home;
    }
    dirs_home().join(".adreply")
}

/// Data directory: $ADREPLY_HOME/data/ or ~/.local/share/adreply/
pub fn data_dir() -> PathBuf {
    if let Some(home) = adreply_home() {
        return home.join("data");
    }
    ProjectDirs::from("", "", "adreply")
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| config_dir().join("data"))
}

/// Database path
pub fn db_path() -> PathBuf {
    data_dir().join("adreply.db")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Ensure config and data directories exist
pub async fn ensure_dirs() -> anyhow::Result<()> {
    for dir in [config_dir(), data_dir()] {
        tokio::fs::create_dir_all(&dir).await?;
    }
    Ok(())
}
