//! Configuration Loader - File Loading, Env Overrides and Validation
//!
//! Handles loading `config.toml`, applying `DB_FILE` / `HTTPD_ADDR`
//! overrides, and validating parameters with clear error messages.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Env var overriding `store.db_file`.
pub const DB_FILE_ENV: &str = "DB_FILE";

/// Env var overriding `server.bind_address`.
pub const HTTPD_ADDR_ENV: &str = "HTTPD_ADDR";

/// Load, override from the environment, and validate configuration.
///
/// A missing file is not an error: defaults are used.
///
/// # Errors
/// Returns detailed error if:
/// - The file exists but can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let mut config = if path.exists() {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
      .with_context(|| format!("Failed to parse {}", path.display()))?
  } else {
    AppConfig::default()
  };

  apply_env_overrides(&mut config, |key| std::env::var(key).ok());
  validate_config(&config)?;

  info!(
    db_file = %config.store.db_file,
    capacity = config.store.buffer_capacity,
    bind = %config.server.bind_address,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Apply env overrides; empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
  F: Fn(&str) -> Option<String>,
{
  if let Some(db_file) = lookup(DB_FILE_ENV).filter(|v| !v.is_empty()) {
    config.store.db_file = db_file;
  }
  if let Some(addr) = lookup(HTTPD_ADDR_ENV).filter(|v| !v.is_empty()) {
    config.server.bind_address = normalize_addr(&addr);
  }
}

/// Accept Go-style `:8080` listen addresses.
fn normalize_addr(addr: &str) -> String {
  if addr.starts_with(':') {
    format!("0.0.0.0{addr}")
  } else {
    addr.to_string()
  }
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.store.db_file.trim().is_empty(),
    "store.db_file must not be empty"
  );
  anyhow::ensure!(
    config.store.buffer_capacity > 0,
    "store.buffer_capacity must be positive, got {}",
    config.store.buffer_capacity
  );
  config
    .server
    .bind_address
    .parse::<SocketAddr>()
    .with_context(|| format!("Invalid server.bind_address: {}", config.server.bind_address))?;

  Ok(())
}
