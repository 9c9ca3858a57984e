//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::{info, warn};

/// Ensure the directory holding the database file exists.
///
/// A bare file name (no parent component) is resolved against the working
/// directory, which always exists.
pub async fn ensure_env(db_file: &Path) -> anyhow::Result<()> {
    let Some(parent) = db_file.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if tokio::fs::metadata(parent).await.is_err() {
        warn!(dir = %parent.display(), "data directory not found; creating it");
    }
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
    info!(db_file = %db_file.display(), "runtime environment ready");
    Ok(())
}
