//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` to keep binary crates importing
//! `service::runtime::ensure_env` without depending directly on `common`.

/// Ensure the database file's directory exists.
pub async fn ensure_env(db_file: impl AsRef<std::path::Path>) -> anyhow::Result<()> {
    common::env::ensure_env(db_file.as_ref()).await
}
