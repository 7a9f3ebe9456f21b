// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup. Values are
//! trimmed and an empty value counts as unset.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `EXECUTOR_SHARED_SECRET` | HMAC secret shared by gateway and executor | Unset |
//! | `EXECUTOR_URL` | Executor base URL; enables forwarding | Unset |
//! | `OPENMIND_URL` | Default upstream completion URL | OpenMind chat completions |
//! | `OM_API_KEY` / `OPENMIND_API_KEY` | Upstream bearer used when the caller sends none | Unset |
//! | `UPSTREAM_TIMEOUT_SECS` | Upstream client timeout | `60` |
//! | `EXECUTOR_TIMEOUT_SECS` | Executor client timeout | `15` |
//! | `RELAY_DEADLINE_SECS` | Deadline for a whole relay call | `90` |
//! | `ENVELOPE_MAX_SKEW_SECS` | Envelope freshness window | `300` |
//! | `LEDGER_DB_PATH` | redb file for durable ledger state | Unset |
//! | `KV_REST_API_URL` / `KV_REST_API_TOKEN` | REST key-value store for ledger state | Unset |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; serve HTTPS when both are set | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! Startup fails when `EXECUTOR_URL` is set without `EXECUTOR_SHARED_SECRET`,
//! when a URL or number does not parse, or when a paired variable is set alone.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use url::Url;

use crate::envelope::DEFAULT_MAX_SKEW_SECS;
use crate::providers::DEFAULT_UPSTREAM_URL;
use crate::relay::RelayTimeouts;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SHARED_SECRET_ENV: &str = "EXECUTOR_SHARED_SECRET";
pub const EXECUTOR_URL_ENV: &str = "EXECUTOR_URL";
pub const UPSTREAM_URL_ENV: &str = "OPENMIND_URL";
pub const API_KEY_ENV: &str = "OM_API_KEY";
pub const API_KEY_ALT_ENV: &str = "OPENMIND_API_KEY";
pub const UPSTREAM_TIMEOUT_ENV: &str = "UPSTREAM_TIMEOUT_SECS";
pub const EXECUTOR_TIMEOUT_ENV: &str = "EXECUTOR_TIMEOUT_SECS";
pub const RELAY_DEADLINE_ENV: &str = "RELAY_DEADLINE_SECS";
pub const MAX_SKEW_ENV: &str = "ENVELOPE_MAX_SKEW_SECS";
pub const LEDGER_DB_PATH_ENV: &str = "LEDGER_DB_PATH";
pub const KV_URL_ENV: &str = "KV_REST_API_URL";
pub const KV_TOKEN_ENV: &str = "KV_REST_API_TOKEN";
pub const TLS_CERT_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("{0} is set but {1} is not")]
    Incomplete(&'static str, &'static str),

    #[error("{0} and {1} cannot both be set")]
    Conflict(&'static str, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Where durable ledger state lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerBackendConfig {
    None,
    Redb(PathBuf),
    RestKv { url: Url, token: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub shared_secret: Option<String>,
    pub executor_url: Option<Url>,
    pub upstream_url: Url,
    pub api_key: Option<String>,
    pub timeouts: RelayTimeouts,
    pub max_skew: Duration,
    pub ledger_backend: LedgerBackendConfig,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let host = env.or_default(HOST_ENV, DEFAULT_HOST);
        let port = match env.optional(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|e| invalid(PORT_ENV, e))?,
            None => DEFAULT_PORT,
        };
        let bind_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|e| invalid(HOST_ENV, e))?;

        let shared_secret = env.optional(SHARED_SECRET_ENV);
        let executor_url = env.optional_url(EXECUTOR_URL_ENV)?;
        if executor_url.is_some() && shared_secret.is_none() {
            return Err(ConfigError::Incomplete(EXECUTOR_URL_ENV, SHARED_SECRET_ENV));
        }

        let upstream_url = match env.optional_url(UPSTREAM_URL_ENV)? {
            Some(url) => url,
            None => parse_url(UPSTREAM_URL_ENV, DEFAULT_UPSTREAM_URL)?,
        };
        let api_key = env
            .optional(API_KEY_ENV)
            .or_else(|| env.optional(API_KEY_ALT_ENV));

        let defaults = RelayTimeouts::default();
        let timeouts = RelayTimeouts {
            upstream: env.secs(UPSTREAM_TIMEOUT_ENV, defaults.upstream)?,
            executor: env.secs(EXECUTOR_TIMEOUT_ENV, defaults.executor)?,
            deadline: env.secs(RELAY_DEADLINE_ENV, defaults.deadline)?,
        };
        let max_skew = env.secs(MAX_SKEW_ENV, Duration::from_secs(DEFAULT_MAX_SKEW_SECS))?;

        let ledger_db = env.optional(LEDGER_DB_PATH_ENV).map(PathBuf::from);
        let kv_url = env.optional_url(KV_URL_ENV)?;
        let kv_token = env.optional(KV_TOKEN_ENV);
        let ledger_backend = match (ledger_db, kv_url, kv_token) {
            (Some(_), Some(_), _) => {
                return Err(ConfigError::Conflict(LEDGER_DB_PATH_ENV, KV_URL_ENV))
            }
            (Some(path), None, _) => LedgerBackendConfig::Redb(path),
            (None, Some(url), Some(token)) => LedgerBackendConfig::RestKv { url, token },
            (None, Some(_), None) => return Err(ConfigError::Incomplete(KV_URL_ENV, KV_TOKEN_ENV)),
            (None, None, _) => LedgerBackendConfig::None,
        };

        let tls = match (env.optional(TLS_CERT_ENV), env.optional(TLS_KEY_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (Some(_), None) => return Err(ConfigError::Incomplete(TLS_CERT_ENV, TLS_KEY_ENV)),
            (None, Some(_)) => return Err(ConfigError::Incomplete(TLS_KEY_ENV, TLS_CERT_ENV)),
            (None, None) => None,
        };

        let log_format = match env.optional(LOG_FORMAT_ENV).as_deref() {
            Some(raw) if raw.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            bind_addr,
            shared_secret,
            executor_url,
            upstream_url,
            api_key,
            timeouts,
            max_skew,
            ledger_backend,
            tls,
            log_format,
        })
    }
}

/// Read `LOG_FORMAT` before the rest of the configuration is loaded.
pub fn log_format_from_env() -> LogFormat {
    match std::env::var(LOG_FORMAT_ENV) {
        Ok(raw) if raw.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn optional_url(&self, name: &'static str) -> Result<Option<Url>, ConfigError> {
        self.optional(name)
            .map(|raw| parse_url(name, &raw))
            .transpose()
    }

    fn secs(&self, name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        match self.optional(name) {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|e| invalid(name, e))?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        var: name,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Ok(Duration::from_secs(secs))
            }
            None => Ok(default),
        }
    }
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| invalid(var, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

fn invalid(var: &'static str, error: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_source(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.upstream_url.as_str(), DEFAULT_UPSTREAM_URL);
        assert_eq!(config.shared_secret, None);
        assert_eq!(config.executor_url, None);
        assert_eq!(config.timeouts.upstream, Duration::from_secs(60));
        assert_eq!(config.timeouts.executor, Duration::from_secs(15));
        assert_eq!(config.timeouts.deadline, Duration::from_secs(90));
        assert_eq!(config.max_skew, Duration::from_secs(300));
        assert_eq!(config.ledger_backend, LedgerBackendConfig::None);
        assert_eq!(config.tls, None);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn values_are_trimmed_and_blank_means_unset() {
        let config = load(&[
            ("PORT", " 9000 "),
            ("EXECUTOR_SHARED_SECRET", "  "),
            ("OM_API_KEY", ""),
            ("OPENMIND_API_KEY", " alt-key "),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.shared_secret, None);
        assert_eq!(config.api_key.as_deref(), Some("alt-key"));
    }

    #[test]
    fn executor_url_requires_secret() {
        assert_eq!(
            load(&[("EXECUTOR_URL", "http://executor:8765")]).unwrap_err(),
            ConfigError::Incomplete(EXECUTOR_URL_ENV, SHARED_SECRET_ENV)
        );

        let config = load(&[
            ("EXECUTOR_URL", "http://executor:8765"),
            ("EXECUTOR_SHARED_SECRET", "s3cret"),
        ])
        .unwrap();
        assert_eq!(config.executor_url.unwrap().host_str(), Some("executor"));
    }

    #[test]
    fn malformed_values_fail_startup() {
        assert!(matches!(
            load(&[("OPENMIND_URL", "not a url")]),
            Err(ConfigError::Invalid { var: "OPENMIND_URL", .. })
        ));
        assert!(matches!(
            load(&[("KV_REST_API_URL", "ftp://kv"), ("KV_REST_API_TOKEN", "t")]),
            Err(ConfigError::Invalid { var: "KV_REST_API_URL", .. })
        ));
        assert!(matches!(
            load(&[("PORT", "http")]),
            Err(ConfigError::Invalid { var: "PORT", .. })
        ));
        assert!(matches!(
            load(&[("RELAY_DEADLINE_SECS", "0")]),
            Err(ConfigError::Invalid { var: "RELAY_DEADLINE_SECS", .. })
        ));
    }

    #[test]
    fn ledger_backend_selection() {
        assert_eq!(
            load(&[("LEDGER_DB_PATH", "/data/ledger.redb")]).unwrap().ledger_backend,
            LedgerBackendConfig::Redb(PathBuf::from("/data/ledger.redb"))
        );
        assert!(matches!(
            load(&[("KV_REST_API_URL", "https://kv.example.com"), ("KV_REST_API_TOKEN", "t")])
                .unwrap()
                .ledger_backend,
            LedgerBackendConfig::RestKv { .. }
        ));
        assert_eq!(
            load(&[("KV_REST_API_URL", "https://kv.example.com")]).unwrap_err(),
            ConfigError::Incomplete(KV_URL_ENV, KV_TOKEN_ENV)
        );
        assert_eq!(
            load(&[
                ("LEDGER_DB_PATH", "/data/ledger.redb"),
                ("KV_REST_API_URL", "https://kv.example.com"),
            ])
            .unwrap_err(),
            ConfigError::Conflict(LEDGER_DB_PATH_ENV, KV_URL_ENV)
        );
    }

    #[test]
    fn tls_paths_must_be_paired() {
        assert_eq!(
            load(&[("TLS_CERT_PATH", "/tls/cert.pem")]).unwrap_err(),
            ConfigError::Incomplete(TLS_CERT_ENV, TLS_KEY_ENV)
        );
        let config = load(&[("TLS_CERT_PATH", "/tls/cert.pem"), ("TLS_KEY_PATH", "/tls/key.pem")])
            .unwrap();
        assert_eq!(config.tls.unwrap().key, PathBuf::from("/tls/key.pem"));
    }

    #[test]
    fn json_log_format_is_case_insensitive() {
        assert_eq!(load(&[("LOG_FORMAT", "JSON")]).unwrap().log_format, LogFormat::Json);
        assert_eq!(load(&[("LOG_FORMAT", "text")]).unwrap().log_format, LogFormat::Pretty);
    }
}
