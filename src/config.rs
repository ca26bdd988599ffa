// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup into [`AppConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `ledger.redb` | `/data` |
//! | `JWT_SECRET` | HS256 signing secret for bearer tokens | Required |
//! | `TOKEN_TTL_SECS` | Bearer token lifetime | `1800` |
//! | `DIRECTORY_CACHE_TTL_SECS` | TTL of the cached directory first page | `600` |
//! | `PROFILE_CACHE_TTL_SECS` | TTL of cached profile snapshots | `3600` |
//! | `DIRECTORY_CACHE_CAPACITY` | Max entries of the directory/profile cache | `1024` |
//! | `TRANSFER_TIMEOUT_MS` | Deadline of one transfer unit | `5000` |
//! | `TLS_CERT_PATH` | PEM certificate chain, enables HTTPS with `TLS_KEY_PATH` | Unset |
//! | `TLS_KEY_PATH` | PEM private key | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Server bind address.
pub const HOST_ENV: &str = "HOST";

/// Server bind port.
pub const PORT_ENV: &str = "PORT";

/// Directory holding the ledger database file.
///
/// # Default
/// `/data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Secret used to sign and verify bearer tokens (HS256).
///
/// Must be at least [`MIN_JWT_SECRET_LEN`] bytes. There is no default.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

pub const TOKEN_TTL_ENV: &str = "TOKEN_TTL_SECS";
pub const DIRECTORY_CACHE_TTL_ENV: &str = "DIRECTORY_CACHE_TTL_SECS";
pub const PROFILE_CACHE_TTL_ENV: &str = "PROFILE_CACHE_TTL_SECS";
pub const DIRECTORY_CACHE_CAPACITY_ENV: &str = "DIRECTORY_CACHE_CAPACITY";
pub const TRANSFER_TIMEOUT_ENV: &str = "TRANSFER_TIMEOUT_MS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 1800;
pub const DEFAULT_DIRECTORY_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_PROFILE_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_DIRECTORY_CACHE_CAPACITY: usize = 1024;
pub const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 5000;

/// Shortest accepted signing secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Ledger database file name inside `DATA_DIR`.
pub const LEDGER_FILE_NAME: &str = "ledger.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("{JWT_SECRET_ENV} must be at least {MIN_JWT_SECRET_LEN} bytes")]
    WeakSecret,

    #[error("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} must be set together")]
    PartialTls,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "plain" | "text" => Ok(Self::Pretty),
            _ => Err(()),
        }
    }
}

/// TLS certificate and key locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub directory_cache_ttl: Duration,
    pub profile_cache_ttl: Duration,
    pub directory_cache_capacity: usize,
    pub transfer_timeout: Duration,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Configuration with every default applied.
    pub fn new(data_dir: impl Into<PathBuf>, jwt_secret: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: data_dir.into(),
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            directory_cache_ttl: Duration::from_secs(DEFAULT_DIRECTORY_CACHE_TTL_SECS),
            profile_cache_ttl: Duration::from_secs(DEFAULT_PROFILE_CACHE_TTL_SECS),
            directory_cache_capacity: DEFAULT_DIRECTORY_CACHE_CAPACITY,
            transfer_timeout: Duration::from_millis(DEFAULT_TRANSFER_TIMEOUT_MS),
            tls: None,
            log_format: LogFormat::default(),
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwt_secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }
        let data_dir = get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        let mut config = Self::new(data_dir, jwt_secret);

        if let Some(host) = get(HOST_ENV) {
            config.host = host;
        }
        config.port = parse_or(&get, PORT_ENV, DEFAULT_PORT)?;
        config.token_ttl = Duration::from_secs(parse_or(&get, TOKEN_TTL_ENV, DEFAULT_TOKEN_TTL_SECS)?);
        config.directory_cache_ttl = Duration::from_secs(parse_or(
            &get,
            DIRECTORY_CACHE_TTL_ENV,
            DEFAULT_DIRECTORY_CACHE_TTL_SECS,
        )?);
        config.profile_cache_ttl = Duration::from_secs(parse_or(
            &get,
            PROFILE_CACHE_TTL_ENV,
            DEFAULT_PROFILE_CACHE_TTL_SECS,
        )?);
        config.directory_cache_capacity = parse_or(
            &get,
            DIRECTORY_CACHE_CAPACITY_ENV,
            DEFAULT_DIRECTORY_CACHE_CAPACITY,
        )?;
        config.transfer_timeout = Duration::from_millis(parse_or(
            &get,
            TRANSFER_TIMEOUT_ENV,
            DEFAULT_TRANSFER_TIMEOUT_MS,
        )?);

        config.tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialTls),
        };

        if let Some(format) = get(LOG_FORMAT_ENV) {
            config.log_format = format.parse().map_err(|_| ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                value: format,
            })?;
        }

        Ok(config)
    }

    /// Path of the ledger database file.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE_NAME)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = load(&[(JWT_SECRET_ENV, SECRET)]).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.ledger_path(), PathBuf::from("/data/ledger.redb"));
        assert_eq!(config.token_ttl, Duration::from_secs(1800));
        assert_eq!(config.directory_cache_ttl, Duration::from_secs(600));
        assert_eq!(config.profile_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.transfer_timeout, Duration::from_millis(5000));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.tls.is_none());
    }

    #[test]
    fn secret_is_required_and_must_be_long_enough() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing(JWT_SECRET_ENV))));
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, "short")]),
            Err(ConfigError::WeakSecret)
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            (JWT_SECRET_ENV, SECRET),
            (PORT_ENV, "9000"),
            (TRANSFER_TIMEOUT_ENV, "250"),
            (LOG_FORMAT_ENV, "JSON"),
            (TLS_CERT_PATH_ENV, "/certs/cert.pem"),
            (TLS_KEY_PATH_ENV, "/certs/key.pem"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.transfer_timeout, Duration::from_millis(250));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.tls.unwrap().key, PathBuf::from("/certs/key.pem"));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = load(&[(JWT_SECRET_ENV, SECRET), (PORT_ENV, "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: PORT_ENV, .. }));

        let err = load(&[(JWT_SECRET_ENV, SECRET), (TLS_CERT_PATH_ENV, "/c.pem")]).unwrap_err();
        assert!(matches!(err, ConfigError::PartialTls));
    }
}
