use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::constants::DEFAULT_BATCH_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid value `{value}` for `{key}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub pool_size: u32,
    pub max_overflow: u32,
    pub pool_timeout: Duration,
    pub pool_recycle: Duration,
    pub echo: bool,
}

// Keeps the password out of logs.
impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("pool_size", &self.pool_size)
            .field("max_overflow", &self.max_overflow)
            .field("pool_timeout", &self.pool_timeout)
            .field("pool_recycle", &self.pool_recycle)
            .field("echo", &self.echo)
            .finish_non_exhaustive()
    }
}

impl DatabaseSettings {
    /// Connection string; an explicit `DATABASE_URL` wins over the individual parts.
    pub fn database_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.database
            ),
        }
    }

    /// Upper bound of pooled connections, r2d2 has no separate overflow.
    pub fn max_connections(&self) -> u32 {
        self.pool_size + self.max_overflow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "testing" => Ok(Environment::Testing),
            "production" => Ok(Environment::Production),
            _ => Err("must be one of development, testing, production".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub app_name: String,
    pub environment: Environment,
    pub debug: bool,
    pub log_level: String,
    pub batch_size: usize,
}

impl AppSettings {
    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &str {
        if self.debug { "debug" } else { &self.log_level }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub app: AppSettings,
}

impl Settings {
    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let url = get("DATABASE_URL");
        let required = |key: &'static str| -> Result<String, ConfigError> {
            match get(key) {
                Some(value) => Ok(value),
                None if url.is_some() => Ok(String::new()),
                None => Err(ConfigError::Missing(key)),
            }
        };

        let pool_timeout = parse_in_range(&get, "DB_POOL_TIMEOUT", 30u64, 1..=300)?;
        let pool_recycle = parse_in_range(&get, "DB_POOL_RECYCLE", 3600u64, 300..=u64::MAX)?;
        let database = DatabaseSettings {
            host: get("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_in_range(&get, "DB_PORT", 5432u16, 1..=u16::MAX)?,
            database: required("DB_DATABASE")?,
            username: required("DB_USERNAME")?,
            password: required("DB_PASSWORD")?,
            pool_size: parse_in_range(&get, "DB_POOL_SIZE", 5u32, 1..=20)?,
            max_overflow: parse_in_range(&get, "DB_MAX_OVERFLOW", 10u32, 0..=50)?,
            pool_timeout: Duration::from_secs(pool_timeout),
            pool_recycle: Duration::from_secs(pool_recycle),
            echo: parse_flag(&get, "DB_ECHO")?,
            url,
        };

        let environment = match get("APP_ENVIRONMENT") {
            Some(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                key: "APP_ENVIRONMENT",
                value,
                reason,
            })?,
            None => Environment::Development,
        };

        let app = AppSettings {
            app_name: get("APP_NAME").unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
            environment,
            debug: parse_flag(&get, "APP_DEBUG")?,
            log_level: get("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            batch_size: parse_in_range(&get, "APP_BATCH_SIZE", DEFAULT_BATCH_SIZE, 1..=usize::MAX)?,
        };

        Ok(Settings { database, app })
    }
}

fn parse_in_range<G, T>(
    get: &G,
    key: &'static str,
    default: T,
    range: std::ops::RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + fmt::Display,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    let value: T = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: "not a number".to_string(),
    })?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: format!("must be between {} and {}", range.start(), range.end()),
        });
    }
    Ok(value)
}

fn parse_flag<G>(get: &G, key: &'static str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(false),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value: raw,
                reason: "expected a boolean".to_string(),
            }),
        },
    }
}
