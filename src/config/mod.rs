//! Configuration management
//!
//! This module handles loading and parsing configuration for the Newsroom API.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Placeholder signing secret used when nothing else is configured.
pub const DEV_SECRET: &str = "newsroom-dev-secret-change-me";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Token configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Account created at startup if it does not exist yet
    #[serde(default)]
    pub superuser: Option<SuperuserConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite path or URL (`:memory:` for an in-memory database)
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "data/newsroom.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

/// Bearer token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign access and refresh tokens
    #[serde(default = "default_secret")]
    pub secret: String,
    /// Access token lifetime in seconds
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
        }
    }
}

impl AuthConfig {
    /// Whether the development placeholder secret is still in use
    pub fn uses_dev_secret(&self) -> bool {
        self.secret == DEV_SECRET
    }
}

fn default_secret() -> String {
    DEV_SECRET.to_string()
}

fn default_access_ttl() -> i64 {
    300
}

fn default_refresh_ttl() -> i64 {
    86400
}

/// Bootstrap superuser account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperuserConfig {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        // Handle empty file - return defaults
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - NEWSROOM_SERVER_HOST
    /// - NEWSROOM_SERVER_PORT
    /// - NEWSROOM_SERVER_CORS_ORIGIN
    /// - NEWSROOM_DATABASE_URL
    /// - NEWSROOM_DATABASE_MAX_CONNECTIONS
    /// - NEWSROOM_AUTH_SECRET
    /// - NEWSROOM_AUTH_ACCESS_TTL_SECS
    /// - NEWSROOM_AUTH_REFRESH_TTL_SECS
    /// - NEWSROOM_SUPERUSER_USERNAME / _PASSWORD / _EMAIL
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("NEWSROOM_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("NEWSROOM_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("NEWSROOM_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        // Database configuration
        if let Ok(url) = std::env::var("NEWSROOM_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(max) = std::env::var("NEWSROOM_DATABASE_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse::<u32>() {
                self.database.max_connections = max;
            }
        }

        // Token configuration
        if let Ok(secret) = std::env::var("NEWSROOM_AUTH_SECRET") {
            self.auth.secret = secret;
        }
        if let Ok(ttl) = std::env::var("NEWSROOM_AUTH_ACCESS_TTL_SECS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.auth.access_token_ttl_secs = ttl;
            }
        }
        if let Ok(ttl) = std::env::var("NEWSROOM_AUTH_REFRESH_TTL_SECS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.auth.refresh_token_ttl_secs = ttl;
            }
        }

        // Bootstrap superuser: username and password must both be present
        if let (Ok(username), Ok(password)) = (
            std::env::var("NEWSROOM_SUPERUSER_USERNAME"),
            std::env::var("NEWSROOM_SUPERUSER_PASSWORD"),
        ) {
            self.superuser = Some(SuperuserConfig {
                username,
                password,
                email: std::env::var("NEWSROOM_SUPERUSER_EMAIL").ok(),
            });
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "NEWSROOM_SERVER_HOST",
    "NEWSROOM_SERVER_PORT",
    "NEWSROOM_SERVER_CORS_ORIGIN",
    "NEWSROOM_DATABASE_URL",
    "NEWSROOM_DATABASE_MAX_CONNECTIONS",
    "NEWSROOM_AUTH_SECRET",
    "NEWSROOM_AUTH_ACCESS_TTL_SECS",
    "NEWSROOM_AUTH_REFRESH_TTL_SECS",
    "NEWSROOM_SUPERUSER_USERNAME",
    "NEWSROOM_SUPERUSER_PASSWORD",
    "NEWSROOM_SUPERUSER_EMAIL",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}
