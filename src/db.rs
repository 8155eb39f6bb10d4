use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Parse an env var, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Initialize a connection pool to the PostgreSQL database.
///
/// Pool sizing is env-tunable (`DB_MAX_CONNECTIONS`, `DB_MIN_CONNECTIONS`,
/// `DB_ACQUIRE_TIMEOUT_SECS`) so test runs can cap connections when many
/// test binaries hit the same database in parallel.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(env_or("DB_MAX_CONNECTIONS", 10u32))
        .min_connections(env_or("DB_MIN_CONNECTIONS", 0u32))
        .acquire_timeout(Duration::from_secs(env_or("DB_ACQUIRE_TIMEOUT_SECS", 3u64)))
        .connect(database_url)
        .await
}
