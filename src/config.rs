use chrono::{DateTime, FixedOffset, Offset, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub log: LogConfig,
    pub password_hash: PasswordHashConfig,
    pub seed_demo: bool,
    pub read_back: ReadBackMode,
}

/// Database settings.
///
/// The store is an embedded SQLite file named after `DB_NAME`. Host, user,
/// password and port are kept so environments written for a networked server
/// still load, but they take no part in the connection string.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
    pub port: u16,
    pub timezone: Timezone,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Path of the SQLite database file.
    pub fn database_path(&self) -> String {
        format!("{}.db", self.name)
    }
}

/// Build the SQLite connection string for a database file, creating it when missing.
pub fn connection_string(db_path: &str) -> String {
    format!("sqlite:{}?mode=rwc", db_path)
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("port", &self.port)
            .field("timezone", &self.timezone)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Zone used when rendering stored UTC timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timezone {
    /// A fixed `+HH:MM` / `-HH:MM` offset.
    Fixed(FixedOffset),
    /// An IANA zone such as `Europe/Paris`, with its daylight saving rules.
    Named(Tz),
}

impl Timezone {
    pub fn utc() -> Self {
        Timezone::Fixed(Utc.fix())
    }

    /// Format `instant` as RFC 3339 in this zone.
    pub fn rfc3339(&self, instant: DateTime<Utc>) -> String {
        match self {
            Timezone::Fixed(offset) => instant.with_timezone(offset).to_rfc3339(),
            Timezone::Named(tz) => instant.with_timezone(tz).to_rfc3339(),
        }
    }
}

impl FromStr for Timezone {
    type Err = String;

    /// Accepts `UTC`, `Z`, `+HH:MM` / `-HH:MM`, or an IANA zone name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(Timezone::utc());
        }

        if s.starts_with(|c: char| c == '+' || c == '-') {
            return s
                .parse::<FixedOffset>()
                .map(Timezone::Fixed)
                .map_err(|e| format!("invalid offset {}: {}", s, e));
        }

        s.parse::<Tz>()
            .map(Timezone::Named)
            .map_err(|_| format!("expected UTC, +HH:MM or an IANA zone name, got {}", s))
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        PasswordHashConfig {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadBackMode {
    Off,
    Summary,
    Detail,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &'static str| -> String {
            env_map
                .get(key)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        let port = parse_with(&get("DB_PORT", "5432"), "DB_PORT", "must be a valid u16")?;

        let timezone = get("DB_TIMEZONE", "UTC")
            .parse::<Timezone>()
            .map_err(|e| ConfigError::InvalidValue("DB_TIMEZONE".to_string(), e))?;

        let max_connections: u32 = parse_with(
            &get("DB_MAX_CONNECTIONS", "5"),
            "DB_MAX_CONNECTIONS",
            "must be a positive integer",
        )?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "DB_MAX_CONNECTIONS".to_string(),
                "must be a positive integer".to_string(),
            ));
        }

        let name = get("DB_NAME", "yourdbname");
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "DB_NAME".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let database = DatabaseConfig {
            host: get("DB_HOST", "localhost"),
            user: get("DB_USER", "yourusername"),
            password: get("DB_PASSWORD", "yourpassword"),
            name,
            port,
            timezone,
            max_connections,
        };

        let level = parse_with(
            &get("LOG_LEVEL", "info"),
            "LOG_LEVEL",
            "must be trace, debug, info, warn, error, or off",
        )?;

        let format = match get("LOG_FORMAT", "json").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LOG_FORMAT".to_string(),
                    format!("must be json or pretty, got {}", other),
                ))
            }
        };

        let password_hash = PasswordHashConfig {
            memory_kib: parse_with(
                &get("PASSWORD_HASH_MEMORY_KIB", "19456"),
                "PASSWORD_HASH_MEMORY_KIB",
                "must be a valid u32",
            )?,
            iterations: parse_with(
                &get("PASSWORD_HASH_ITERATIONS", "2"),
                "PASSWORD_HASH_ITERATIONS",
                "must be a valid u32",
            )?,
            parallelism: parse_with(
                &get("PASSWORD_HASH_PARALLELISM", "1"),
                "PASSWORD_HASH_PARALLELISM",
                "must be a valid u32",
            )?,
        };

        let seed_demo = parse_bool(&get("SEED_DEMO", "true"), "SEED_DEMO")?;

        let read_back = match get("READ_BACK", "summary").to_lowercase().as_str() {
            "off" => ReadBackMode::Off,
            "summary" => ReadBackMode::Summary,
            "detail" => ReadBackMode::Detail,
            other => {
                return Err(ConfigError::InvalidValue(
                    "READ_BACK".to_string(),
                    format!("must be off, summary, or detail, got {}", other),
                ))
            }
        };

        Ok(Config {
            database,
            log: LogConfig { level, format },
            password_hash,
            seed_demo,
            read_back,
        })
    }
}

fn parse_with<T: FromStr>(value: &str, key: &str, reason: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), reason.to_string()))
}

fn parse_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be a boolean, got {}", other),
        )),
    }
}
