use crate::nip05::DEFAULT_LOOKUP_TIMEOUT;
use crate::nip98::{ProofPolicy, DEFAULT_MAX_AGE_SECS, DEFAULT_MAX_FUTURE_SECS};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Every five minutes, on the minute.
pub const DEFAULT_NIP05_CRON: &str = "0 */5 * * * *";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STORAGE_PATH: &str = "./data";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Who may use the service and how usernames are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationConfig {
    /// When false, write routes accept unauthenticated requests
    pub enabled: bool,
    /// Hex, npub, or `name@domain` entries
    pub allowed_users: Vec<String>,
    pub admin_users: Vec<String>,
    /// Resolve `name@domain` entries through NIP-05
    pub use_nip05: bool,
    /// Cron expression (five or six fields) for the refresh task
    pub nip05_cron: String,
    pub nip05_timeout: Duration,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_users: Vec::new(),
            admin_users: Vec::new(),
            use_nip05: false,
            nip05_cron: DEFAULT_NIP05_CRON.to_string(),
            nip05_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

impl AuthorizationConfig {
    /// Read `AUTH_ENABLED`, `ALLOWED_USERS`, `ADMIN_USERS`, `USE_NIP05`,
    /// `NIP05_CRON`, and `NIP05_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            enabled: env_bool("AUTH_ENABLED", defaults.enabled)?,
            allowed_users: env_list("ALLOWED_USERS"),
            admin_users: env_list("ADMIN_USERS"),
            use_nip05: env_bool("USE_NIP05", defaults.use_nip05)?,
            nip05_cron: env::var("NIP05_CRON")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.nip05_cron),
            nip05_timeout: Duration::from_secs(env_parse(
                "NIP05_TIMEOUT_SECS",
                defaults.nip05_timeout.as_secs(),
            )?),
        })
    }
}

/// Full runtime configuration for the file service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub storage_path: PathBuf,
    pub authorization: AuthorizationConfig,
    pub proof: ProofPolicy,
    /// Require the proof's `u` and `method` tags to match the request
    pub bind_request: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            authorization: AuthorizationConfig::default(),
            proof: ProofPolicy::default(),
            bind_request: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// `NIP98_MAX_FUTURE_SECS=off` disables the upper bound on proof timestamps.
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_future_secs = match env::var("NIP98_MAX_FUTURE_SECS").as_deref() {
            Ok("off") | Ok("none") => None,
            _ => Some(env_parse("NIP98_MAX_FUTURE_SECS", DEFAULT_MAX_FUTURE_SECS)?),
        };

        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT)?,
            storage_path: env::var("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_PATH)),
            authorization: AuthorizationConfig::from_env()?,
            proof: ProofPolicy {
                max_age_secs: env_parse("NIP98_MAX_AGE_SECS", DEFAULT_MAX_AGE_SECS)?,
                max_future_secs,
            },
            bind_request: env_bool("NIP98_BIND_REQUEST", true)?,
        })
    }
}

/// Split a comma-separated list, trimming whitespace and dropping empties.
pub fn csv_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn env_list(name: &'static str) -> Vec<String> {
    env::var(name).map(|v| csv_list(&v)).unwrap_or_default()
}

fn env_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                value,
                reason: "expected true or false".to_string(),
            }),
        },
    }
}

fn env_parse<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) if value.trim().is_empty() => Ok(default),
        Ok(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}
