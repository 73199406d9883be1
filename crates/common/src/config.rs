use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub ssl_mode: String,
    pub run_migrations: bool,
}

impl DatabaseConfig {
    /// Build database URL from configuration
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.username, self.password, self.host, self.port, self.database, self.ssl_mode
        )
    }

    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: env_or("DATABASE_HOST", defaults.host),
            port: parse_env("DATABASE_PORT", defaults.port)?,
            username: env_or("DATABASE_USER", defaults.username),
            password: env_or("DATABASE_PASSWORD", defaults.password),
            database: env_or("DATABASE_NAME", defaults.database),
            max_connections: parse_env("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            ssl_mode: env_or("DATABASE_SSL_MODE", defaults.ssl_mode),
            run_migrations: parse_env("DATABASE_RUN_MIGRATIONS", defaults.run_migrations)?,
        })
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "orders".to_string(),
            max_connections: 10,
            ssl_mode: "disable".to_string(),
            run_migrations: false,
        }
    }
}

/// Which order repository backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

/// Kafka consumer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    pub brokers: String,
    pub orders_topic: String,
    pub group_id: String,
    pub session_timeout: Duration,
    pub max_poll_interval: Duration,
}

impl KafkaConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            brokers: env_or("KAFKA_BROKERS", defaults.brokers),
            orders_topic: env_or("KAFKA_ORDERS_TOPIC", defaults.orders_topic),
            group_id: env_or("KAFKA_GROUP_ID", defaults.group_id),
            session_timeout: Duration::from_millis(parse_env(
                "KAFKA_SESSION_TIMEOUT_MS",
                defaults.session_timeout.as_millis() as u64,
            )?),
            max_poll_interval: Duration::from_millis(parse_env(
                "KAFKA_MAX_POLL_INTERVAL_MS",
                defaults.max_poll_interval.as_millis() as u64,
            )?),
        })
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            orders_topic: "orders".to_string(),
            group_id: "order-saver".to_string(),
            session_timeout: Duration::from_secs(30),
            max_poll_interval: Duration::from_secs(300),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub port: u16,
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Order cache policy
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub warm_limit: i64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            warm_limit: 100,
        }
    }
}

/// Graceful shutdown budget
#[derive(Debug, Clone, Deserialize)]
pub struct ShutdownConfig {
    pub total: Duration,
    pub per_component: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            total: Duration::from_secs(15),
            per_component: Duration::from_secs(5),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub storage_backend: StorageBackend,
    pub database: DatabaseConfig,
    pub kafka: KafkaConfig,
    pub http: HttpConfig,
    pub cache: CacheSettings,
    pub shutdown: ShutdownConfig,
    pub log_level: String,
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// Absent variables fall back to defaults; present but unparseable ones
    /// are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let storage_backend = match std::env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "STORAGE_BACKEND".to_string(),
                value,
            })?,
            Err(_) => defaults.storage_backend,
        };

        Ok(Self {
            storage_backend,
            database: DatabaseConfig::from_env()?,
            kafka: KafkaConfig::from_env()?,
            http: HttpConfig {
                port: parse_env("HTTP_PORT", defaults.http.port)?,
                request_timeout: Duration::from_secs(parse_env(
                    "HTTP_REQUEST_TIMEOUT_SECS",
                    defaults.http.request_timeout.as_secs(),
                )?),
            },
            cache: CacheSettings {
                ttl: Duration::from_secs(parse_env(
                    "CACHE_TTL_SECS",
                    defaults.cache.ttl.as_secs(),
                )?),
                warm_limit: parse_env_at_least("CACHE_WARM_LIMIT", defaults.cache.warm_limit, 0)?,
            },
            shutdown: ShutdownConfig {
                total: Duration::from_secs(parse_env(
                    "SHUTDOWN_TIMEOUT_SECS",
                    defaults.shutdown.total.as_secs(),
                )?),
                per_component: Duration::from_secs(parse_env(
                    "COMPONENT_SHUTDOWN_TIMEOUT_SECS",
                    defaults.shutdown.per_component.as_secs(),
                )?),
            },
            log_level: env_or("RUST_LOG", defaults.log_level),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::Postgres,
            database: DatabaseConfig::default(),
            kafka: KafkaConfig::default(),
            http: HttpConfig::default(),
            cache: CacheSettings::default(),
            shutdown: ShutdownConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

/// Like `parse_env`, but values below `min` are rejected
fn parse_env_at_least<T>(key: &str, default: T, min: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + ToString,
{
    let value = parse_env(key, default)?;
    if value < min {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}
