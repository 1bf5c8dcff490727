use dotenv::dotenv;
use log::{info, warn};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set when RUST_ENV=production")]
    MissingProductionVar(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "prod" | "production" => Ok(Environment::Production),
            other => Err(format!("Unknown environment: {}", other)),
        }
    }
}

fn current_environment() -> Environment {
    env::var("RUST_ENV")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

/// Env var with a parsed fallback. Unset or unparseable both yield the
/// default.
fn var_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or(default),
        Err(_) => default,
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub leaderboard: LeaderboardSettings,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LeaderboardSettings {
    /// Maximum entries per materialized snapshot.
    pub entry_limit: usize,
    /// Upper bound on a single aggregation query.
    pub aggregation_timeout_secs: u64,
    /// TTL for cached athlete display info used during enrichment.
    pub profile_cache_ttl_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        // An explicit ENV_FILE_PATH wins over the conventional .env files.
        match env::var("ENV_FILE_PATH") {
            Ok(path) if !path.is_empty() => {
                info!("Loading environment from {}", path);
                dotenv::from_filename(&path).ok();
            }
            _ => {
                dotenv().ok();
                let suffixed = format!(".env.{}", environment_suffix(current_environment()));
                if suffixed != ".env.development" {
                    let _ = dotenv::from_filename(&suffixed);
                }
            }
        }

        let environment = current_environment();
        info!("Loading configuration for environment: {:?}", environment);

        let config = Config {
            environment,
            server: ServerConfig::from_env(environment),
            database: DatabaseConfig::from_env(environment)?,
            leaderboard: LeaderboardSettings::from_env(),
        };
        config.validate()?;
        config.log_summary();
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.environment == Environment::Production && self.database.password == "test" {
            return invalid("production database password cannot be 'test'");
        }
        if self.server.port == 0 {
            return invalid("server port cannot be 0");
        }
        if self.leaderboard.entry_limit == 0 {
            return invalid("leaderboard entry limit cannot be 0");
        }
        if self.leaderboard.aggregation_timeout_secs == 0 {
            return invalid("aggregation timeout cannot be 0");
        }
        Ok(())
    }

    fn log_summary(&self) {
        info!(
            "Server {}:{} ({} workers), database {}",
            self.server.host, self.server.port, self.server.workers, self.database.name
        );
        info!(
            "Leaderboards: {} entries max, {}s aggregation budget, {}s profile TTL",
            self.leaderboard.entry_limit,
            self.leaderboard.aggregation_timeout_secs,
            self.leaderboard.profile_cache_ttl_secs
        );
        if self.environment == Environment::Development {
            warn!("Running in development mode");
        }
    }

    #[allow(dead_code)]
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn environment_suffix(env: Environment) -> &'static str {
    match env {
        Environment::Development => "development",
        Environment::Test => "test",
        Environment::Production => "production",
    }
}

impl ServerConfig {
    fn from_env(environment: Environment) -> Self {
        let backend_url =
            env::var("BACKEND_URL").unwrap_or_else(|_| "http://0.0.0.0:50010".to_string());
        let (url_host, url_port) = split_host_port(&backend_url);
        let default_workers = if environment == Environment::Production {
            8
        } else {
            1
        };

        ServerConfig {
            // SERVER_HOST / SERVER_PORT override the BACKEND_URL parts
            host: env::var("SERVER_HOST").unwrap_or(url_host),
            port: var_or("SERVER_PORT", url_port),
            workers: var_or("BACKEND_WORKERS", default_workers),
        }
    }
}

fn split_host_port(raw: &str) -> (String, u16) {
    match url::Url::parse(raw) {
        Ok(parsed) => (
            parsed.host_str().unwrap_or("127.0.0.1").to_string(),
            parsed.port().unwrap_or(50010),
        ),
        Err(_) => ("127.0.0.1".to_string(), 50010),
    }
}

impl DatabaseConfig {
    fn from_env(environment: Environment) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            env::var(key).map_err(|_| ConfigError::MissingProductionVar(key))
        };

        match environment {
            Environment::Production => Ok(DatabaseConfig {
                url: required("ARANGO_URL")?,
                name: required("ARANGO_DB")?,
                username: required("ARANGO_USERNAME")?,
                password: required("ARANGO_PASSWORD")?,
            }),
            Environment::Test => Ok(DatabaseConfig {
                url: env::var("ARANGO_URL")
                    .unwrap_or_else(|_| "http://test-arangodb:8529".to_string()),
                name: env::var("ARANGO_DB").unwrap_or_else(|_| "trackline_test".to_string()),
                username: env::var("ARANGO_USERNAME").unwrap_or_else(|_| "root".to_string()),
                password: env::var("ARANGO_PASSWORD").unwrap_or_else(|_| "test".to_string()),
            }),
            Environment::Development => {
                if env::var("ARANGO_URL").is_err() {
                    warn!("ARANGO_URL not set, using http://localhost:8529");
                }
                Ok(DatabaseConfig {
                    url: env::var("ARANGO_URL")
                        .unwrap_or_else(|_| "http://localhost:8529".to_string()),
                    name: env::var("ARANGO_DB").unwrap_or_else(|_| "trackline_dev".to_string()),
                    username: env::var("ARANGO_USERNAME").unwrap_or_else(|_| "test".to_string()),
                    password: env::var("ARANGO_PASSWORD").unwrap_or_else(|_| "test".to_string()),
                })
            }
        }
    }
}

impl LeaderboardSettings {
    fn from_env() -> Self {
        LeaderboardSettings {
            entry_limit: var_or("LEADERBOARD_ENTRY_LIMIT", 100),
            aggregation_timeout_secs: var_or("AGGREGATION_TIMEOUT_SECS", 20),
            profile_cache_ttl_secs: var_or("PROFILE_CACHE_TTL_SECS", 600),
        }
    }
}
