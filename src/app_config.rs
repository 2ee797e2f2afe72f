//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with FLAGSTAFF_)
//! 2. Config file (config.toml)
//! 3. Default values
//!
//! Secrets like the database and Redis URLs are read from plain environment
//! variables (DATABASE_URL, REDIS_URL), not from the config file.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Global application configuration
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Database pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Maximum connections in the pool
    pub max_connections: u32,
    /// Minimum idle connections kept open
    pub min_connections: u32,
    /// Connection acquisition timeout in seconds
    pub connect_timeout_seconds: u64,
    /// Idle connection reap timeout in seconds
    pub idle_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            connect_timeout_seconds: 5,
            idle_timeout_seconds: 300,
        }
    }
}

/// Flag page cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Key prefix for cached flag pages
    pub key_prefix: String,
    /// Time-to-live for cached flag pages, in seconds
    pub ttl_seconds: u64,
    /// Upper bound on any single cache command, in milliseconds.
    /// A command that exceeds this is treated as a miss.
    pub command_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: "features".to_string(),
            ttl_seconds: 30,
            command_timeout_ms: 1000,
        }
    }
}

/// Pagination limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Flags per page (default)
    pub default_page_size: u64,
    /// Maximum flags per page a caller may request
    pub max_page_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub limits: LimitsConfig,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file (optional)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            // Override with environment variables (FLAGSTAFF_ prefix)
            // e.g., FLAGSTAFF_SERVER_BIND
            .add_source(
                Environment::with_prefix("FLAGSTAFF")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reload configuration from file
    pub fn reload() -> Result<(), ConfigError> {
        let new_config = Self::load()?;
        if let Ok(mut config) = APP_CONFIG.write() {
            *config = new_config;
            log::info!("Configuration reloaded");
        }
        Ok(())
    }
}

/// Initialize application configuration
///
/// This triggers the lazy loading of the config file and logs the result.
/// Should be called early in application startup.
pub fn init() {
    let config = APP_CONFIG.read().unwrap();
    log::info!(
        "Configuration loaded: server.bind = {}, cache.ttl_seconds = {}",
        config.server.bind,
        config.cache.ttl_seconds
    );
}

// Convenience functions for accessing global config

/// Get the current application configuration
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().map(|c| c.clone()).unwrap_or_default()
}

/// Get server configuration
pub fn server() -> ServerConfig {
    get_config().server
}

/// Get database pool configuration
pub fn database() -> DatabaseConfig {
    get_config().database
}

/// Get cache configuration
pub fn cache() -> CacheConfig {
    get_config().cache
}

/// Get pagination limits configuration
pub fn limits() -> LimitsConfig {
    get_config().limits
}
