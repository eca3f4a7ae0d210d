use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Secret used when `JWT_SECRET_KEY` is not set
pub const DEFAULT_JWT_SECRET: &str = "super-secret-key";

/// Web service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JWT signing secret from .env (not in YAML)
    #[serde(skip)]
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Loaded from `DATABASE_URL` when present
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    /// Connection attempts before giving up at startup
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            connect_attempts: default_connect_attempts(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Access token lifetime
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    /// PBKDF2 rounds for new password hashes
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl(),
            password_iterations: default_password_iterations(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_connect_attempts() -> u32 {
    10
}

fn default_retry_delay() -> u64 {
    2
}

fn default_token_ttl() -> u64 {
    3600
}

fn default_password_iterations() -> u32 {
    600_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            log_level: default_log_level(),
            jwt_secret: String::new(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from YAML file and .env
    ///
    /// A missing file is not an error: defaults plus `DATABASE_URL` are
    /// enough to run.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();

        // Load .env file
        dotenv::dotenv().ok(); // Don't fail if .env doesn't exist

        let mut config = if config_path.exists() {
            let yaml_content = std::fs::read_to_string(config_path)?;
            Self::from_yaml(&yaml_content)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from YAML text without env overrides
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not a mapping
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply environment overrides through the given lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Override database URL from environment if present
        if let Some(db_url) = lookup("DATABASE_URL") {
            info!("Overriding database URL from environment variable");
            self.database.url = db_url;
        }

        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid PORT"),
            }
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }

        self.jwt_secret = match lookup("JWT_SECRET_KEY") {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("JWT_SECRET_KEY not set, using the built-in development secret");
                DEFAULT_JWT_SECRET.to_string()
            }
        };
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(ConfigError::EnvVarMissing("DATABASE_URL".to_string()));
        }

        if !self.database.url.starts_with("postgres://")
            && !self.database.url.starts_with("postgresql://")
        {
            return Err(ConfigError::ValidationError(
                "database url must use the postgres:// scheme".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "port must be greater than 0".to_string(),
            ));
        }

        if self.auth.token_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "token_ttl_secs must be greater than 0".to_string(),
            ));
        }

        if self.auth.password_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "password_iterations must be greater than 0".to_string(),
            ));
        }

        // Validate log_level
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Listen address: {}", self.bind_address());
        info!("  Database url: {}", redact_url(&self.database.url));
        info!("  Max connections: {}", self.database.max_connections);
        info!("  Token lifetime: {} seconds", self.auth.token_ttl_secs);
        info!("  Log level: {}", self.log_level);
    }
}

/// Hide the password part of a connection URL
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{}://{}:***@{}", scheme, user, host)
        }
        None => url.to_string(),
    }
}
