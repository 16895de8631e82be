//! Environment configuration

use crate::runtime::SessionLimits;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Server configuration read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub db_path: PathBuf,
    /// `None` disables notifications
    pub webhook_url: Option<String>,
    pub webhook_timeout: Duration,
    pub persist_timeout: Duration,
    pub session_ttl: Duration,
    pub session_cleanup_interval: Duration,
    pub max_sessions: usize,
    /// `None` allows any origin
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("TRIAGE_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".triage-desk").join("patients.db")
            },
            PathBuf::from,
        );

        let webhook_url = lookup("WEBHOOK_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS").and_then(|raw| {
            let origins: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
            (!origins.is_empty()).then_some(origins)
        });

        Ok(Self {
            host: parse_or(&lookup, "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&lookup, "PORT", 8000)?,
            db_path,
            webhook_url,
            webhook_timeout: secs_or(&lookup, "WEBHOOK_TIMEOUT_SECS", 10)?,
            persist_timeout: secs_or(&lookup, "PERSIST_TIMEOUT_SECS", 10)?,
            session_ttl: secs_or(&lookup, "SESSION_TTL_SECS", 3600)?,
            session_cleanup_interval: secs_or(&lookup, "SESSION_CLEANUP_SECS", 300)?,
            max_sessions: capacity_or(&lookup, "MAX_SESSIONS", 10_000)?,
            cors_allowed_origins,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            max_sessions: self.max_sessions,
            idle_ttl: self.session_ttl,
            cleanup_interval: self.session_cleanup_interval,
        }
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

/// Durations are whole seconds and must be positive
fn secs_or<F>(lookup: &F, var: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(lookup, var, default)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: "0".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// A capacity of zero could never hold the session being created
fn capacity_or<F>(lookup: &F, var: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, var, default)? {
        0 => Err(ConfigError::Invalid {
            var,
            value: "0".to_string(),
        }),
        n => Ok(n),
    }
}
