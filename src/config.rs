// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup. Invalid
//! values fail startup with a [`ConfigError`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding `ledger.redb` | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HS256 signing secret, at least 32 bytes | Required (dev builds fall back to a fixed secret) |
//! | `TOKEN_TTL_HOURS` | Access token lifetime | `168` |
//! | `DEFAULT_ACCOUNT_BALANCE` | Opening balance of new user accounts | `0.00` |
//! | `OPERATION_TIMEOUT_SECS` | Deadline for one ledger unit of work | `100` |
//! | `BANK_NAME` | Bank name shown on virtual accounts | `Guaranty Trust Bank` |
//! | `TERMII_*` | SMS/OTP/email provider, see `providers::termii` | Sandbox in dev builds |
//! | `IDENTITYPASS_*` | BVN verification provider, see `providers::identitypass` | Sandbox in dev builds |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{path::PathBuf, time::Duration};

use crate::ledger::{Amount, MoneyError};

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const TOKEN_TTL_HOURS_ENV: &str = "TOKEN_TTL_HOURS";
pub const DEFAULT_ACCOUNT_BALANCE_ENV: &str = "DEFAULT_ACCOUNT_BALANCE";
pub const OPERATION_TIMEOUT_SECS_ENV: &str = "OPERATION_TIMEOUT_SECS";
pub const BANK_NAME_ENV: &str = "BANK_NAME";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// File name of the ledger database inside `DATA_DIR`.
pub const LEDGER_DB_FILE: &str = "ledger.redb";

pub const MIN_JWT_SECRET_LEN: usize = 32;

#[cfg(feature = "dev")]
const DEV_JWT_SECRET: &str = "olra-dev-secret-do-not-use-in-production";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is required")]
    Missing { name: &'static str },

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: Vec<u8>,
    pub token_ttl_hours: i64,
    pub default_account_balance: Amount,
    pub operation_timeout: Duration,
    pub bank_name: String,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("data_dir", &self.data_dir)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("default_account_balance", &self.default_account_balance)
            .field("operation_timeout", &self.operation_timeout)
            .field("bank_name", &self.bank_name)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get(PORT_ENV) {
            Some(v) => v.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => 8080,
        };

        let jwt_secret = match get(JWT_SECRET_ENV) {
            Some(secret) if secret.len() >= MIN_JWT_SECRET_LEN => secret.into_bytes(),
            Some(_) => {
                return Err(ConfigError::Invalid {
                    name: JWT_SECRET_ENV,
                    reason: format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
                })
            }
            None => dev_jwt_secret()?,
        };

        let token_ttl_hours = parse_positive(get(TOKEN_TTL_HOURS_ENV), TOKEN_TTL_HOURS_ENV, 168)?;
        let timeout_secs = parse_positive(get(OPERATION_TIMEOUT_SECS_ENV), OPERATION_TIMEOUT_SECS_ENV, 100)?;

        let default_account_balance = match get(DEFAULT_ACCOUNT_BALANCE_ENV) {
            Some(v) => Amount::parse(&v).map_err(|e: MoneyError| ConfigError::Invalid {
                name: DEFAULT_ACCOUNT_BALANCE_ENV,
                reason: e.to_string(),
            })?,
            None => Amount::ZERO,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected 'json' or 'pretty', got '{other}'"),
                })
            }
        };

        Ok(Self {
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| "./data".to_string())),
            host: get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            jwt_secret,
            token_ttl_hours,
            default_account_balance,
            operation_timeout: Duration::from_secs(timeout_secs as u64),
            bank_name: get(BANK_NAME_ENV).unwrap_or_else(|| "Guaranty Trust Bank".to_string()),
            log_format,
        })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_DB_FILE)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_positive(value: Option<String>, name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => match v.parse::<i64>() {
            Ok(n) if n > 0 => Ok(n),
            Ok(_) => Err(ConfigError::Invalid {
                name,
                reason: "must be greater than zero".to_string(),
            }),
            Err(e) => Err(ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }),
        },
    }
}

#[cfg(feature = "dev")]
fn dev_jwt_secret() -> Result<Vec<u8>, ConfigError> {
    tracing::warn!("JWT_SECRET not set, using the development secret");
    Ok(DEV_JWT_SECRET.as_bytes().to_vec())
}

#[cfg(not(feature = "dev"))]
fn dev_jwt_secret() -> Result<Vec<u8>, ConfigError> {
    Err(ConfigError::Missing { name: JWT_SECRET_ENV })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[(JWT_SECRET_ENV, SECRET)]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.token_ttl_hours, 168);
        assert_eq!(config.default_account_balance, Amount::ZERO);
        assert_eq!(config.operation_timeout, Duration::from_secs(100));
        assert_eq!(config.bank_name, "Guaranty Trust Bank");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.ledger_path(), PathBuf::from("./data").join(LEDGER_DB_FILE));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            (JWT_SECRET_ENV, SECRET),
            (PORT_ENV, "9000"),
            (DEFAULT_ACCOUNT_BALANCE_ENV, "1000.50"),
            (OPERATION_TIMEOUT_SECS_ENV, "5"),
            (LOG_FORMAT_ENV, "json"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.default_account_balance, Amount::from_minor(100_050));
        assert_eq!(config.operation_timeout, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_values_fail() {
        assert!(load(&[(JWT_SECRET_ENV, "short")]).is_err());
        assert!(load(&[(JWT_SECRET_ENV, SECRET), (PORT_ENV, "http")]).is_err());
        assert!(load(&[(JWT_SECRET_ENV, SECRET), (DEFAULT_ACCOUNT_BALANCE_ENV, "1.234")]).is_err());
        assert!(load(&[(JWT_SECRET_ENV, SECRET), (OPERATION_TIMEOUT_SECS_ENV, "0")]).is_err());
        assert!(load(&[(JWT_SECRET_ENV, SECRET), (LOG_FORMAT_ENV, "xml")]).is_err());
    }

    #[cfg(not(feature = "dev"))]
    #[test]
    fn missing_secret_fails_outside_dev_builds() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing { name: JWT_SECRET_ENV })));
    }
}
