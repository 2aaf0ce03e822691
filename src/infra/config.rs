//! Centralized configuration (environment variables + defaults).

use anyhow::Context;

pub const DEFAULT_DB_SCHEMA: &str = "public";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parsed_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} is invalid ({}): {}", name, raw, e)),
        _ => Ok(default),
    }
}

/// Database URL must be provided (no default) for safety.
pub fn database_url() -> anyhow::Result<String> {
    std::env::var("DATABASE_URL").context("DATABASE_URL must be set")
}

/// PostgreSQL schema that holds the dynamic tables.
pub fn db_schema() -> String {
    var_or("DB_SCHEMA", DEFAULT_DB_SCHEMA)
}

/// Connection pool size (at least 1).
pub fn max_connections() -> anyhow::Result<u32> {
    Ok(parsed_or("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?.max(1))
}

pub fn bind_addr() -> String {
    var_or("BIND_ADDR", DEFAULT_BIND_ADDR)
}

/// Request body limit for uploads, in bytes.
pub fn max_upload_bytes() -> anyhow::Result<usize> {
    parsed_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)
}
