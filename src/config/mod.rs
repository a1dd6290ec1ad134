//! Configuration management
//!
//! Process-level configuration for Moonglade is read from `config.yml` and may be
//! overridden with `MOONGLADE_*` environment variables. Missing values fall back
//! to defaults, so an absent or empty file is a valid configuration.
//!
//! Blog settings that administrators edit at runtime (site title, comment
//! moderation, ...) are not part of this file; see `services::blog_config`.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub mention: MentionConfig,
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
    /// CORS allowed origin (for cookie-based auth from the admin frontend)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Public root URL of the blog, used for sitemap entries and mention targets
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            base_url: default_base_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, `sqlite:` URL, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,
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
    "data/moonglade.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

fn default_max_capacity() -> u64 {
    10_000
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
    /// Username of the account seeded on first start
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    /// Password of the account seeded on first start
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
            admin_username: default_admin_username(),
            admin_password: default_admin_password(),
        }
    }
}

fn default_session_days() -> i64 {
    7
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "admin123".to_string()
}

/// Outbound webmention / pingback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionConfig {
    /// Timeout for fetching remote documents, in seconds
    #[serde(default = "default_mention_timeout")]
    pub timeout_seconds: u64,
    /// User agent sent with mention requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for MentionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_mention_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_mention_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("Moonglade/{}", env!("CARGO_PKG_VERSION"))
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or empty file yields the default configuration; invalid YAML
    /// is reported with its location.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file, then apply `MOONGLADE_*` overrides.
    ///
    /// Recognized variables:
    /// - MOONGLADE_SERVER_HOST, MOONGLADE_SERVER_PORT, MOONGLADE_SERVER_CORS_ORIGIN,
    ///   MOONGLADE_SERVER_BASE_URL
    /// - MOONGLADE_DATABASE_URL
    /// - MOONGLADE_CACHE_TTL_SECONDS
    /// - MOONGLADE_AUTH_SESSION_DAYS, MOONGLADE_AUTH_ADMIN_USERNAME,
    ///   MOONGLADE_AUTH_ADMIN_PASSWORD
    pub fn load_with_env(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MOONGLADE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MOONGLADE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(origin) = std::env::var("MOONGLADE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Ok(base_url) = std::env::var("MOONGLADE_SERVER_BASE_URL") {
            self.server.base_url = base_url;
        }

        if let Ok(url) = std::env::var("MOONGLADE_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(ttl) = std::env::var("MOONGLADE_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }

        if let Ok(days) = std::env::var("MOONGLADE_AUTH_SESSION_DAYS") {
            if let Ok(days) = days.parse::<i64>() {
                self.auth.session_days = days;
            }
        }
        if let Ok(username) = std::env::var("MOONGLADE_AUTH_ADMIN_USERNAME") {
            self.auth.admin_username = username;
        }
        if let Ok(password) = std::env::var("MOONGLADE_AUTH_ADMIN_PASSWORD") {
            self.auth.admin_password = password;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.base_url cannot be empty".to_string(),
            ));
        }
        if self.auth.session_days <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.session_days must be positive".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.server.base_url.trim_end_matches('/')
    }
}

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

// Env-var tests mutate process state, so they take this lock.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn clear_env() {
        for key in [
            "MOONGLADE_SERVER_HOST",
            "MOONGLADE_SERVER_PORT",
            "MOONGLADE_SERVER_CORS_ORIGIN",
            "MOONGLADE_SERVER_BASE_URL",
            "MOONGLADE_DATABASE_URL",
            "MOONGLADE_CACHE_TTL_SECONDS",
            "MOONGLADE_AUTH_SESSION_DAYS",
            "MOONGLADE_AUTH_ADMIN_USERNAME",
            "MOONGLADE_AUTH_ADMIN_PASSWORD",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let config = Config::load(Path::new("nonexistent_moonglade.yml")).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "data/moonglade.db");
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.auth.session_days, 7);
        assert_eq!(config.mention.timeout_seconds, 10);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "   \n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3000\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.admin_username, "admin");
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9000
  base_url: "https://blog.example.com/"
database:
  url: "sqlite:blog.db"
  max_connections: 4
cache:
  ttl_seconds: 120
auth:
  session_days: 30
  admin_username: "owner"
mention:
  timeout_seconds: 3
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.base_url(), "https://blog.example.com");
        assert_eq!(config.database.url, "sqlite:blog.db");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.cache.ttl_seconds, 120);
        assert_eq!(config.auth.session_days, 30);
        assert_eq!(config.auth.admin_username, "owner");
        assert_eq!(config.mention.timeout_seconds, 3);
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err().to_string();
        assert!(err.contains("Failed to parse"));
    }

    #[test]
    fn test_load_rejects_zero_session_days() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "auth:\n  session_days: 0\n").unwrap();

        let err = Config::load(file.path()).unwrap_err().to_string();
        assert!(err.contains("session_days"));
    }

    #[test]
    fn test_env_override() {
        let _guard = lock_env();
        clear_env();

        std::env::set_var("MOONGLADE_SERVER_PORT", "9999");
        std::env::set_var("MOONGLADE_DATABASE_URL", ":memory:");
        std::env::set_var("MOONGLADE_AUTH_ADMIN_USERNAME", "root");

        let config = Config::load_with_env(Path::new("nonexistent_moonglade.yml")).unwrap();
        clear_env();

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.database.url, ":memory:");
        assert_eq!(config.auth.admin_username, "root");
    }

    #[test]
    fn test_env_override_invalid_port_ignored() {
        let _guard = lock_env();
        clear_env();

        std::env::set_var("MOONGLADE_SERVER_PORT", "not-a-port");
        let config = Config::load_with_env(Path::new("nonexistent_moonglade.yml")).unwrap();
        clear_env();

        assert_eq!(config.server.port, 8080);
    }
}
