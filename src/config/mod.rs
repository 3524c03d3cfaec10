//! Configuration management for mongo-curry
//!
//! This module handles building and loading the database configuration:
//! - A validated [`DbConfig`] record (host, port, production and test database names)
//! - The `configure` loader that publishes those values into the environment
//! - An optional TOML settings file with connection-pool and logging tables
//!
//! Settings precedence (highest to lowest):
//! 1. Environment variables (`DB_URL`, `DB_PORT`, `DB_NAME`, `TEST_DB_NAME`)
//! 2. Settings file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{ConfigError, MongoCurryError, Result};

pub mod env;

pub use env::{EnvStore, MapEnv, ProcessEnv};

/// Environment key holding the server host.
pub const DB_URL: &str = "DB_URL";
/// Environment key holding the server port.
pub const DB_PORT: &str = "DB_PORT";
/// Environment key holding the production database name.
pub const DB_NAME: &str = "DB_NAME";
/// Environment key holding the test database name.
pub const TEST_DB_NAME: &str = "TEST_DB_NAME";

/// Raw configuration record as supplied by the caller.
///
/// Every field is optional here so that a missing value can be reported by
/// name; [`ConfigInput::validate`] turns it into a [`DbConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigInput {
    #[serde(rename = "DB_URL", alias = "endpoint_host", default)]
    pub db_url: Option<String>,

    #[serde(rename = "DB_PORT", alias = "endpoint_port", default)]
    pub db_port: Option<u16>,

    #[serde(rename = "DB_NAME", alias = "database_name", default)]
    pub db_name: Option<String>,

    #[serde(rename = "TEST_DB_NAME", alias = "test_database_name", default)]
    pub test_db_name: Option<String>,
}

/// Validated database configuration.
///
/// All four fields are guaranteed present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub endpoint_host: String,
    pub endpoint_port: u16,
    pub database_name: String,
    pub test_database_name: String,
}

/// Full settings, as read from a settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Database endpoint and names
    #[serde(default)]
    pub database: ConfigInput,

    /// Connection pool configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Connect and lease-acquire timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Maximum number of concurrent leases (and driver pool size)
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,

    /// Minimum number of idle driver connections
    #[serde(default = "default_min_pool_size")]
    pub min_pool_size: u32,

    /// Driver connection idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,

    /// Application name reported to the server
    #[serde(default)]
    pub app_name: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_timeout() -> u64 {
    30
}

fn default_max_pool_size() -> u32 {
    10
}

fn default_min_pool_size() -> u32 {
    2
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_pool_size: default_max_pool_size(),
            min_pool_size: default_min_pool_size(),
            idle_timeout: default_idle_timeout(),
            app_name: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl ConfigInput {
    /// Build an input with every field set.
    pub fn new(
        db_url: impl Into<String>,
        db_port: u16,
        db_name: impl Into<String>,
        test_db_name: impl Into<String>,
    ) -> Self {
        Self {
            db_url: Some(db_url.into()),
            db_port: Some(db_port),
            db_name: Some(db_name.into()),
            test_db_name: Some(test_db_name.into()),
        }
    }

    /// Read the four keys from an environment store.
    ///
    /// A port that is present but not a number is an error; absent keys stay `None`.
    pub fn from_env_store(env: &dyn EnvStore) -> Result<Self> {
        let db_port = match env.get(DB_PORT) {
            Some(raw) if !raw.trim().is_empty() => {
                Some(raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                    field: DB_PORT.to_string(),
                    value: raw.clone(),
                })?)
            }
            _ => None,
        };

        Ok(Self {
            db_url: env.get(DB_URL),
            db_port,
            db_name: env.get(DB_NAME),
            test_db_name: env.get(TEST_DB_NAME),
        })
    }

    /// Fill unset fields from `other`.
    pub fn or(self, other: ConfigInput) -> ConfigInput {
        ConfigInput {
            db_url: non_empty(self.db_url).or(other.db_url),
            db_port: self.db_port.filter(|p| *p != 0).or(other.db_port),
            db_name: non_empty(self.db_name).or(other.db_name),
            test_db_name: non_empty(self.test_db_name).or(other.test_db_name),
        }
    }

    /// Check that every field is present and non-empty.
    ///
    /// Fields are checked in the order `DB_URL`, `DB_PORT`, `DB_NAME`,
    /// `TEST_DB_NAME`; the first missing one is reported.
    pub fn validate(&self) -> Result<DbConfig> {
        let endpoint_host = required(&self.db_url, DB_URL)?;
        let endpoint_port = match self.db_port {
            Some(port) if port != 0 => port,
            _ => return Err(ConfigError::MissingField(DB_PORT.to_string()).into()),
        };
        let database_name = required(&self.db_name, DB_NAME)?;
        let test_database_name = required(&self.test_db_name, TEST_DB_NAME)?;

        Ok(DbConfig {
            endpoint_host,
            endpoint_port,
            database_name,
            test_database_name,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: &Option<String>, key: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(ConfigError::MissingField(key.to_string()).into()),
    }
}

impl DbConfig {
    /// Read and validate the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_env_store(&ProcessEnv)
    }

    /// Read and validate the configuration from an environment store.
    pub fn from_env_store(env: &dyn EnvStore) -> Result<Self> {
        ConfigInput::from_env_store(env)?.validate()
    }

    /// Connection string for the configured endpoint.
    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}", self.endpoint_host, self.endpoint_port)
    }

    /// Key/value pairs as published to the environment.
    pub fn env_pairs(&self) -> [(&'static str, String); 4] {
        [
            (DB_URL, self.endpoint_host.clone()),
            (DB_PORT, self.endpoint_port.to_string()),
            (DB_NAME, self.database_name.clone()),
            (TEST_DB_NAME, self.test_database_name.clone()),
        ]
    }
}

impl From<DbConfig> for ConfigInput {
    fn from(config: DbConfig) -> Self {
        ConfigInput::new(
            config.endpoint_host,
            config.endpoint_port,
            config.database_name,
            config.test_database_name,
        )
    }
}

/// Validate `input` and publish it into `env`.
///
/// Nothing is written unless every field is valid, and nothing fails once
/// writing has started. Keys that already exist in `env` keep their value and
/// a notice is logged. Returns the effective configuration: an existing env
/// value wins for its key when it is usable, otherwise the input's value.
pub fn configure(input: &ConfigInput, env: &dyn EnvStore) -> Result<DbConfig> {
    let config = input.validate()?;

    for (key, value) in config.env_pairs() {
        if env.get(key).is_some() {
            info!("{} is already defined in the environment", key);
        } else {
            env.set(key, &value);
        }
    }

    Ok(effective(config, env))
}

fn effective(config: DbConfig, env: &dyn EnvStore) -> DbConfig {
    let text = |key: &str, fallback: String| non_empty(env.get(key)).unwrap_or(fallback);
    let endpoint_port = env
        .get(DB_PORT)
        .and_then(|raw| raw.trim().parse::<u16>().ok())
        .filter(|port| *port != 0)
        .unwrap_or(config.endpoint_port);

    DbConfig {
        endpoint_host: text(DB_URL, config.endpoint_host),
        endpoint_port,
        database_name: text(DB_NAME, config.database_name),
        test_database_name: text(TEST_DB_NAME, config.test_database_name),
    }
}

impl Settings {
    /// Load settings from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the settings file
    ///
    /// # Returns
    /// * `Result<Settings>` - Parsed settings or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                MongoCurryError::from(ConfigError::FileNotFound(path.display().to_string()))
            }
            _ => MongoCurryError::Io(e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default file (if present) and the process environment
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path(), &ProcessEnv)
    }

    /// Load settings from `path` (if present), letting `env` override the database table
    pub fn load_from(path: &Path, env: &dyn EnvStore) -> Result<Self> {
        let mut settings = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        settings.database = ConfigInput::from_env_store(env)?.or(settings.database);
        Ok(settings)
    }

    /// Get the default settings file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mongo-curry")
            .join("config.toml")
    }

    /// Validated database configuration
    pub fn db_config(&self) -> Result<DbConfig> {
        self.database.validate()
    }

    /// Validate the non-database tables
    pub fn validate(&self) -> Result<()> {
        self.connection.validate()
    }
}

impl ConnectionConfig {
    /// Check pool bounds
    pub fn validate(&self) -> Result<()> {
        if self.max_pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_pool_size".to_string(),
                value: self.max_pool_size.to_string(),
            }
            .into());
        }
        if self.min_pool_size > self.max_pool_size {
            return Err(ConfigError::InvalidValue {
                field: "min_pool_size".to_string(),
                value: self.min_pool_size.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Connect and acquire timeout as Duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }
}

impl LogLevel {
    /// Directive string for an env filter
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigInput {
        ConfigInput::new("localhost", 27017, "app", "app-test")
    }

    fn missing_field(err: MongoCurryError) -> String {
        match err {
            MongoCurryError::Config(ConfigError::MissingField(field)) => field,
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_configure_writes_every_key() {
        let env = MapEnv::new();
        let config = configure(&sample(), &env).unwrap();

        assert_eq!(env.get(DB_URL).as_deref(), Some("localhost"));
        assert_eq!(env.get(DB_PORT).as_deref(), Some("27017"));
        assert_eq!(env.get(DB_NAME).as_deref(), Some("app"));
        assert_eq!(env.get(TEST_DB_NAME).as_deref(), Some("app-test"));
        assert_eq!(config.uri(), "mongodb://localhost:27017");
    }

    #[test]
    fn test_configure_preserves_existing_keys() {
        let env = MapEnv::from_pairs([(DB_NAME, "already-here")]);
        let config = configure(&sample(), &env).unwrap();

        assert_eq!(env.get(DB_NAME).as_deref(), Some("already-here"));
        assert_eq!(config.database_name, "already-here");
        assert_eq!(config.test_database_name, "app-test");
    }

    #[test]
    fn test_configure_is_idempotent() {
        let env = MapEnv::new();
        let first = configure(&sample(), &env).unwrap();
        let second = configure(&ConfigInput::new("other", 1, "x", "y"), &env).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_configure_tolerates_unparsable_existing_port() {
        let env = MapEnv::from_pairs([(DB_PORT, "tcp://172.17.0.2:27017")]);
        let config = configure(&sample(), &env).unwrap();

        assert_eq!(config.endpoint_port, 27017);
        assert_eq!(env.get(DB_PORT).as_deref(), Some("tcp://172.17.0.2:27017"));
        assert_eq!(env.get(DB_URL).as_deref(), Some("localhost"));
        assert_eq!(env.get(TEST_DB_NAME).as_deref(), Some("app-test"));
    }

    #[test]
    fn test_configure_tolerates_empty_existing_key() {
        let env = MapEnv::from_pairs([(DB_NAME, "")]);
        let config = configure(&sample(), &env).unwrap();

        assert_eq!(config.database_name, "app");
        assert_eq!(env.get(DB_NAME).as_deref(), Some(""));
        assert_eq!(env.get(TEST_DB_NAME).as_deref(), Some("app-test"));
    }

    #[test]
    fn test_configure_uses_existing_port_when_numeric() {
        let env = MapEnv::from_pairs([(DB_PORT, "27018")]);
        let config = configure(&sample(), &env).unwrap();
        assert_eq!(config.uri(), "mongodb://localhost:27018");
    }

    #[test]
    fn test_missing_field_fails_before_mutation() {
        let cases = [
            (ConfigInput { db_url: None, ..sample() }, DB_URL),
            (ConfigInput { db_port: None, ..sample() }, DB_PORT),
            (ConfigInput { db_port: Some(0), ..sample() }, DB_PORT),
            (ConfigInput { db_name: Some(String::new()), ..sample() }, DB_NAME),
            (ConfigInput { test_db_name: None, ..sample() }, TEST_DB_NAME),
        ];

        for (input, key) in cases {
            let env = MapEnv::new();
            let err = configure(&input, &env).unwrap_err();
            assert_eq!(missing_field(err), key);
            assert!(env.is_empty(), "nothing may be written when {key} is missing");
        }
    }

    #[test]
    fn test_first_missing_field_is_reported() {
        let err = ConfigInput::default().validate().unwrap_err();
        assert_eq!(missing_field(err), DB_URL);
    }

    #[test]
    fn test_invalid_port_in_env() {
        let env = MapEnv::from_pairs([
            (DB_URL, "localhost"),
            (DB_PORT, "not-a-port"),
            (DB_NAME, "app"),
            (TEST_DB_NAME, "app-test"),
        ]);
        let err = DbConfig::from_env_store(&env).unwrap_err();
        assert!(matches!(
            err,
            MongoCurryError::Config(ConfigError::InvalidValue { ref field, .. }) if field == DB_PORT
        ));
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = Settings::from_toml_str(
            r#"
            [database]
            DB_URL = "db.internal"
            DB_PORT = 27018
            DB_NAME = "app"
            TEST_DB_NAME = "app-test"

            [connection]
            max_pool_size = 4

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let db = settings.db_config().unwrap();
        assert_eq!(db.uri(), "mongodb://db.internal:27018");
        assert_eq!(settings.connection.max_pool_size, 4);
        assert_eq!(settings.connection.min_pool_size, 2);
        assert_eq!(settings.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_settings_reject_bad_pool_bounds() {
        let err = Settings::from_toml_str("[connection]\nmax_pool_size = 1\nmin_pool_size = 3\n")
            .unwrap_err();
        assert!(matches!(err, MongoCurryError::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = std::env::temp_dir().join(format!("mongo-curry-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "[database]\nDB_URL = \"file-host\"\nDB_PORT = 1000\nDB_NAME = \"file\"\nTEST_DB_NAME = \"file-test\"\n",
        )
        .unwrap();

        let env = MapEnv::from_pairs([(DB_URL, "env-host")]);
        let settings = Settings::load_from(&path, &env).unwrap();
        let db = settings.db_config().unwrap();
        assert_eq!(db.endpoint_host, "env-host");
        assert_eq!(db.endpoint_port, 1000);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let env = MapEnv::new();
        let settings = Settings::load_from(Path::new("/nonexistent/mongo-curry.toml"), &env).unwrap();
        assert_eq!(settings.connection, ConnectionConfig::default());
        assert!(settings.db_config().is_err());
    }

    #[test]
    fn test_connection_timeout() {
        let config = ConnectionConfig::default();
        assert_eq!(config.connection_timeout(), Duration::from_secs(30));
        assert_eq!(config.idle_timeout(), Duration::from_secs(300));
    }
}
