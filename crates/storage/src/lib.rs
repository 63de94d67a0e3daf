//! Storage layer: relational connection handling.
//!
//! Accepts Postgres URLs, SQLite URLs, or a bare file path (opened as SQLite).
//! All of them come back as an [`AnyPool`] so callers stay driver-agnostic.

use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;
use tracing::debug;

/// Turns a bare path into a SQLite URL; URLs pass through unchanged.
pub fn normalize_url(database_url: &str) -> String {
    if database_url.contains("://") || database_url.starts_with("sqlite:") {
        return database_url.to_string();
    }
    let path = std::path::PathBuf::from(database_url);
    let norm = path.to_string_lossy().replace('\\', "/");
    if path.is_absolute() {
        format!("sqlite:///{}", norm.trim_start_matches('/'))
    } else {
        format!("sqlite://{}", norm)
    }
}

/// True for SQLite URLs that open a private in-memory database.
pub fn is_sqlite_memory(url: &str) -> bool {
    url.starts_with("sqlite::memory:") || (url.starts_with("sqlite:") && url.contains("mode=memory"))
}

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<AnyPool> {
    install_default_drivers();
    let url = normalize_url(database_url);
    let mut opts = AnyPoolOptions::new();
    if is_sqlite_memory(&url) {
        // Each in-memory SQLite connection is its own database.
        opts = opts.max_connections(1);
    } else {
        opts = opts.max_connections(max_connections.max(1));
    }
    let pool = opts.connect(&url).await?;
    debug!(max_connections, "relational source connected");
    Ok(pool)
}
