use serde::{Deserialize, Serialize};
use std::fs;

use anyhow::{Context, Result};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub wallet: WalletConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    /// Postgres sslmode: disable, prefer, require, ...
    pub ssl: String,
    #[serde(rename = "maxIdleConns", default = "default_max_idle")]
    pub max_idle_conns: u32,
    #[serde(rename = "maxOpenConns", default = "default_max_open")]
    pub max_open_conns: u32,
    /// Connection lifetime in seconds
    #[serde(rename = "connMaxLifetime", default = "default_conn_lifetime")]
    pub conn_max_lifetime: u64,
}

fn default_max_idle() -> u32 {
    5
}

fn default_max_open() -> u32 {
    20
}

fn default_conn_lifetime() -> u64 {
    1800
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Token lifetime in seconds
    pub expiry: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WalletConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub json: bool,
    pub rotation: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "./logs".to_string(),
            file: "betbridge.log".to_string(),
            json: false,
            rotation: "daily".to_string(),
        }
    }
}

/// Returns the current environment (development|production)
pub fn environment() -> String {
    if let Ok(env) = std::env::var("GAME_BROKER_ENV") {
        return env;
    }
    if let Ok(env) = std::env::var("ENV") {
        return env;
    }
    "development".to_string()
}

impl AppConfig {
    /// Load config from YAML file based on environment
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config: Self =
            serde_yaml::from_str(&content).context("Failed to parse config yaml")?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Environment variables take precedence over YAML config.
    /// Format: GB_<SECTION>_<FIELD> (uppercase with underscores)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("GB_SERVER_HOST") {
            tracing::info!("Config override: server.host = {} (from GB_SERVER_HOST)", host);
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("GB_SERVER_PORT")
            && let Ok(p) = port.parse::<u16>()
        {
            tracing::info!("Config override: server.port = {} (from GB_SERVER_PORT)", p);
            self.server.port = p;
        }

        if let Ok(host) = std::env::var("GB_DATABASE_HOST") {
            tracing::info!("Config override: database.host = {} (from GB_DATABASE_HOST)", host);
            self.database.host = host;
        }
        if let Ok(password) = std::env::var("GB_DATABASE_PASSWORD") {
            tracing::info!(
                "Config override: database.password = [REDACTED] (from GB_DATABASE_PASSWORD)"
            );
            self.database.password = password;
        }

        if let Ok(secret) = std::env::var("GB_JWT_SECRET") {
            tracing::info!("Config override: jwt.secret = [REDACTED] (from GB_JWT_SECRET)");
            self.jwt.secret = secret;
        }

        if let Ok(url) = std::env::var("GB_WALLET_URL") {
            tracing::info!("Config override: wallet.url = {} (from GB_WALLET_URL)", url);
            self.wallet.url = url;
        }
        if let Ok(key) = std::env::var("GB_WALLET_API_KEY") {
            tracing::info!("Config override: wallet.api_key = [REDACTED] (from GB_WALLET_API_KEY)");
            self.wallet.api_key = key;
        }

        if let Ok(level) = std::env::var("GB_LOG_LEVEL") {
            tracing::info!("Config override: log.level = {} (from GB_LOG_LEVEL)", level);
            self.log.level = level;
        }
    }

    /// Validate configuration at startup
    ///
    /// Returns an error if any critical configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Invalid server.port: must be > 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log.level '{}': must be one of {:?}",
                self.log.level,
                valid_levels
            );
        }

        if self.jwt.secret.is_empty() {
            anyhow::bail!("Invalid jwt.secret: must not be empty");
        }
        if self.jwt.expiry == 0 {
            anyhow::bail!("Invalid jwt.expiry: must be > 0 seconds");
        }

        if self.wallet.url.is_empty() {
            anyhow::bail!("Invalid wallet.url: must not be empty");
        }

        if self.database.max_open_conns == 0 {
            anyhow::bail!("Invalid database.maxOpenConns: must be > 0");
        }

        Ok(())
    }

    /// Postgres connection string
    pub fn dsn(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.database.user,
            self.database.password,
            self.database.host,
            self.database.port,
            self.database.name,
            self.database.ssl,
        )
    }

    /// Server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                host: "localhost".to_string(),
                port: 5432,
                user: "betbridge".to_string(),
                password: "pw".to_string(),
                name: "betbridge_test".to_string(),
                ssl: "disable".to_string(),
                max_idle_conns: 5,
                max_open_conns: 20,
                conn_max_lifetime: 1800,
            },
            jwt: JwtConfig {
                secret: "secret".to_string(),
                expiry: 86400,
            },
            wallet: WalletConfig {
                url: "http://localhost:9090".to_string(),
                api_key: "key".to_string(),
            },
            log: LogConfig::default(),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_port() {
        let mut config = valid_config();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = valid_config();
        config.log.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_jwt_secret() {
        let mut config = valid_config();
        config.jwt.secret = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dsn_format() {
        let config = valid_config();
        assert_eq!(
            config.dsn(),
            "postgres://betbridge:pw@localhost:5432/betbridge_test?sslmode=disable"
        );
    }

    #[test]
    fn test_server_address() {
        assert_eq!(valid_config().server_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_load_development_config() {
        // Reads the checked-in config/development.yaml from the crate root
        let config = AppConfig::load("development").expect("development config should load");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.name, "betbridge_dev");
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_load_unknown_environment_fails() {
        assert!(AppConfig::load("no-such-env").is_err());
    }

    #[test]
    fn test_environment_defaults_to_development() {
        // Only meaningful when the selector vars are unset in the test env
        if std::env::var("GAME_BROKER_ENV").is_err() && std::env::var("ENV").is_err() {
            assert_eq!(environment(), "development");
        }
    }
}
