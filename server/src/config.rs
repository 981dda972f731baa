// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use sqlx::mysql::MySqlConnectOptions;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Where bookings, accounts and settings are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
  MySql,
  /// Process-local tables; nothing survives a restart.
  Memory,
}

impl FromStr for StorageBackend {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "mysql" => Ok(StorageBackend::MySql),
      "memory" => Ok(StorageBackend::Memory),
      other => Err(AppError::Config(format!(
        "Invalid STORAGE_BACKEND '{}': expected 'mysql' or 'memory'",
        other
      ))),
    }
  }
}

/// Upper bound for `SESSION_TTL_MINUTES` (30 days).
pub const MAX_SESSION_TTL_MINUTES: u64 = 30 * 24 * 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,

  pub storage_backend: StorageBackend,
  pub db_host: String,
  pub db_port: u16,
  pub db_user: String,
  pub db_password: String,
  pub db_name: String,
  pub db_pool_size: u32,

  /// Artificial latency of the simulated payment gateway.
  pub payment_delay: Duration,
  pub session_ttl: Duration,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "0.0.0.0".to_string(),
      server_port: 5000,
      storage_backend: StorageBackend::MySql,
      db_host: "127.0.0.1".to_string(),
      db_port: 3306,
      db_user: String::new(),
      db_password: String::new(),
      db_name: String::new(),
      db_pool_size: 10,
      payment_delay: Duration::from_millis(2500),
      session_ttl: Duration::from_secs(720 * 60),
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source. `from_env` passes the
  /// process environment; tests pass a map.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let defaults = Self::default();
    let get_env = |var_name: &str| lookup(var_name).filter(|v| !v.trim().is_empty());
    let require = |var_name: &str| {
      get_env(var_name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };

    fn parse<T: FromStr>(var_name: &str, raw: Option<String>, default: T) -> Result<T>
    where
      T::Err: std::fmt::Display,
    {
      match raw {
        None => Ok(default),
        Some(value) => value
          .trim()
          .parse::<T>()
          .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, value, e))),
      }
    }

    let storage_backend = match get_env("STORAGE_BACKEND") {
      Some(raw) => raw.parse::<StorageBackend>()?,
      None => defaults.storage_backend,
    };

    let (db_user, db_name) = match storage_backend {
      StorageBackend::MySql => (require("DB_USER")?, require("DB_NAME")?),
      StorageBackend::Memory => (
        get_env("DB_USER").unwrap_or_default(),
        get_env("DB_NAME").unwrap_or_default(),
      ),
    };

    let db_pool_size = parse("DB_POOL_SIZE", get_env("DB_POOL_SIZE"), defaults.db_pool_size)?;
    if db_pool_size == 0 {
      return Err(AppError::Config("DB_POOL_SIZE must be at least 1".to_string()));
    }

    let payment_delay_ms = parse("PAYMENT_DELAY_MS", get_env("PAYMENT_DELAY_MS"), 2500u64)?;
    let session_ttl_minutes = parse("SESSION_TTL_MINUTES", get_env("SESSION_TTL_MINUTES"), 720u64)?;
    if !(1..=MAX_SESSION_TTL_MINUTES).contains(&session_ttl_minutes) {
      return Err(AppError::Config(format!(
        "SESSION_TTL_MINUTES must be between 1 and {}",
        MAX_SESSION_TTL_MINUTES
      )));
    }
    let session_ttl_secs = session_ttl_minutes
      .checked_mul(60)
      .ok_or_else(|| AppError::Config("SESSION_TTL_MINUTES is too large".to_string()))?;

    let config = Self {
      server_host: get_env("SERVER_HOST").unwrap_or(defaults.server_host),
      server_port: parse("PORT", get_env("PORT"), defaults.server_port)?,
      storage_backend,
      db_host: get_env("DB_HOST").unwrap_or(defaults.db_host),
      db_port: parse("DB_PORT", get_env("DB_PORT"), defaults.db_port)?,
      db_user,
      // An empty password is legitimate for local MySQL.
      db_password: lookup("DB_PASSWORD").unwrap_or_default(),
      db_name,
      db_pool_size,
      payment_delay: Duration::from_millis(payment_delay_ms),
      session_ttl: Duration::from_secs(session_ttl_secs),
    };

    tracing::info!(
      backend = ?config.storage_backend,
      db_host = %config.db_host,
      db_name = %config.db_name,
      port = config.server_port,
      "Application configuration loaded successfully."
    );
    Ok(config)
  }

  /// Connection options for the pool. Credentials are passed as fields, so
  /// reserved URL characters in the password need no escaping.
  pub fn connect_options(&self) -> MySqlConnectOptions {
    let options = MySqlConnectOptions::new()
      .host(&self.db_host)
      .port(self.db_port)
      .username(&self.db_user)
      .database(&self.db_name);
    if self.db_password.is_empty() {
      options
    } else {
      options.password(&self.db_password)
    }
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use sqlx::ConnectOptions;
  use std::collections::HashMap;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| vars.get(name).cloned()
  }

  #[test]
  fn defaults_apply_when_only_credentials_are_set() {
    let config = AppConfig::from_lookup(lookup(&[("DB_USER", "mediahub"), ("DB_NAME", "mediahub")])).unwrap();
    assert_eq!(config.server_port, 5000);
    assert_eq!(config.db_port, 3306);
    assert_eq!(config.db_pool_size, 10);
    assert_eq!(config.payment_delay, Duration::from_millis(2500));
    assert_eq!(config.storage_backend, StorageBackend::MySql);
    assert_eq!(config.session_ttl, Duration::from_secs(720 * 60));
  }

  #[test]
  fn mysql_backend_requires_user_and_database() {
    let err = AppConfig::from_lookup(lookup(&[("DB_NAME", "mediahub")])).unwrap_err();
    assert!(matches!(err, AppError::Config(m) if m.contains("DB_USER")));
  }

  #[test]
  fn memory_backend_needs_no_database() {
    let config = AppConfig::from_lookup(lookup(&[("STORAGE_BACKEND", "memory"), ("PAYMENT_DELAY_MS", "0")])).unwrap();
    assert_eq!(config.storage_backend, StorageBackend::Memory);
    assert_eq!(config.payment_delay, Duration::ZERO);
  }

  #[test]
  fn malformed_numbers_are_config_errors() {
    let err = AppConfig::from_lookup(lookup(&[("STORAGE_BACKEND", "memory"), ("PORT", "eighty")])).unwrap_err();
    assert!(matches!(err, AppError::Config(m) if m.contains("PORT")));
  }

  #[test]
  fn connect_options_carry_each_credential() {
    let config = AppConfig::from_lookup(lookup(&[
      ("DB_USER", "root"),
      ("DB_PASSWORD", "s3cret"),
      ("DB_NAME", "mediahub"),
      ("DB_HOST", "db"),
      ("DB_PORT", "3307"),
    ]))
    .unwrap();
    let options = config.connect_options();
    assert_eq!(options.get_host(), "db");
    assert_eq!(options.get_port(), 3307);
    assert_eq!(options.get_username(), "root");
    assert_eq!(options.get_database(), Some("mediahub"));
  }

  #[test]
  fn reserved_characters_in_password_keep_host_and_database() {
    let config = AppConfig::from_lookup(lookup(&[
      ("DB_USER", "root"),
      ("DB_PASSWORD", "p@ss/w#rd?%"),
      ("DB_NAME", "mediahub"),
      ("DB_HOST", "db"),
    ]))
    .unwrap();
    let options = config.connect_options();
    assert_eq!(options.get_host(), "db");
    assert_eq!(options.get_database(), Some("mediahub"));

    // The URL sqlx derives from the options escapes the password.
    let url = options.to_url_lossy();
    let reparsed = MySqlConnectOptions::from_str(url.as_str()).unwrap();
    assert_eq!(reparsed.get_host(), "db");
    assert_eq!(reparsed.get_port(), 3306);
    assert_eq!(reparsed.get_database(), Some("mediahub"));
  }

  #[test]
  fn session_ttl_outside_bounds_is_a_config_error() {
    for raw in ["0", "43201", "18446744073709551615"] {
      let err = AppConfig::from_lookup(lookup(&[("STORAGE_BACKEND", "memory"), ("SESSION_TTL_MINUTES", raw)])).unwrap_err();
      assert!(matches!(err, AppError::Config(ref m) if m.contains("SESSION_TTL_MINUTES")), "{}", raw);
    }
    let config =
      AppConfig::from_lookup(lookup(&[("STORAGE_BACKEND", "memory"), ("SESSION_TTL_MINUTES", "43200")])).unwrap();
    assert_eq!(config.session_ttl, Duration::from_secs(43_200 * 60));
  }
}
