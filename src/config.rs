//! Configuration management for sessiond
//!
//! Loads settings from TOML file at ~/.sessiond/config.toml

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Credential and token settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Expired token sweep
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Data directory (defaults to ~/.sessiond)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".sessiond"))
        .unwrap_or_else(|| PathBuf::from(".sessiond"))
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port (default: 19480)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server host (default: 127.0.0.1 - localhost only)
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    19480
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Credential and token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Minimum password length accepted at sign-up
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// Optional secret prepended to passwords before hashing.
    /// Changing it invalidates every stored password.
    #[serde(default)]
    pub pepper: Option<String>,

    /// Lifetime applied to new tokens when the client sends no `expires`.
    /// Unset means such tokens never expire.
    #[serde(default)]
    pub default_token_ttl_hours: Option<u32>,
}

/// Upper bound for `auth.default_token_ttl_hours` (100 years)
pub const MAX_TOKEN_TTL_HOURS: u32 = 100 * 366 * 24;

fn default_min_password_length() -> usize {
    8
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            min_password_length: default_min_password_length(),
            pepper: None,
            default_token_ttl_hours: None,
        }
    }
}

/// Expired token sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Whether the periodic sweep runs
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minutes between sweeps
    #[serde(default = "default_sweep_interval")]
    pub interval_minutes: u32,
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u32 {
    60
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            enabled: true,
            interval_minutes: default_sweep_interval(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            sweep: SweepConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(path.as_ref());

        if !expanded_path.exists() {
            return Err(CoreError::Config(format!(
                "Configuration file not found: {}",
                expanded_path.display()
            )));
        }

        let content = std::fs::read_to_string(&expanded_path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.auth.min_password_length == 0 {
            return Err(CoreError::Config(
                "auth.min_password_length must be at least 1".to_string(),
            ));
        }
        if self
            .auth
            .default_token_ttl_hours
            .is_some_and(|hours| hours > MAX_TOKEN_TTL_HOURS)
        {
            return Err(CoreError::Config(format!(
                "auth.default_token_ttl_hours must be at most {MAX_TOKEN_TTL_HOURS}"
            )));
        }
        if self.sweep.enabled && self.sweep.interval_minutes == 0 {
            return Err(CoreError::Config(
                "sweep.interval_minutes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the data directory, expanding ~ if present
    pub fn data_dir(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }

    /// Path of the SQLite database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("sessiond.db")
    }

    /// Get the server socket address
    pub fn server_addr(&self) -> SocketAddr {
        use std::net::ToSocketAddrs;

        format!("{}:{}", self.server.host, self.server.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], self.server.port)))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SESSIOND_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SESSIOND_SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            } else {
                tracing::warn!("Ignoring invalid SESSIOND_SERVER_PORT: {}", port);
            }
        }
        if let Ok(data_dir) = std::env::var("SESSIOND_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(pepper) = std::env::var("SESSIOND_AUTH_PEPPER") {
            self.auth.pepper = if pepper.is_empty() { None } else { Some(pepper) };
        }
    }

    /// Create a default configuration file at the given path
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let content = r#"# sessiond configuration

[server]
# Port to listen on (default: 19480)
port = 19480

# Host to bind to
# "127.0.0.1" = localhost only
# "0.0.0.0" = all interfaces
host = "127.0.0.1"

[auth]
# Shortest password accepted at sign-up
min_password_length = 8

# Secret prepended to every password before hashing.
# Changing it locks out every existing user.
# pepper = "change-me"

# Lifetime of tokens created without an explicit `expires`.
# Leave unset for tokens that never expire.
# default_token_ttl_hours = 720

[sweep]
# Periodically delete expired tokens
enabled = true
interval_minutes = 60
"#;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }
}

/// Expand ~ to home directory in paths
pub fn expand_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 19480);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.auth.min_password_length, 8);
        assert!(config.auth.pepper.is_none());
        assert!(config.auth.default_token_ttl_hours.is_none());
        assert!(config.sweep.enabled);
        assert_eq!(config.sweep.interval_minutes, 60);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
port = 9000
host = "0.0.0.0"

[auth]
min_password_length = 12
pepper = "salty"
default_token_ttl_hours = 24

[sweep]
enabled = false
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.min_password_length, 12);
        assert_eq!(config.auth.pepper.as_deref(), Some("salty"));
        assert_eq!(config.auth.default_token_ttl_hours, Some(24));
        assert!(!config.sweep.enabled);
        assert_eq!(config.sweep.interval_minutes, 60);
    }

    #[test]
    fn test_generated_default_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::create_default(&path).unwrap();
        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.server.port, 19480);
        assert_eq!(config.auth.min_password_length, 8);
        assert!(config.sweep.enabled);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.sweep.interval_minutes = 0;
        assert!(config.validate().is_err());

        config.sweep.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds_token_ttl() {
        let mut config = Config::default();
        config.auth.default_token_ttl_hours = Some(MAX_TOKEN_TTL_HOURS);
        assert!(config.validate().is_ok());

        config.auth.default_token_ttl_hours = Some(MAX_TOKEN_TTL_HOURS + 1);
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        config.auth.default_token_ttl_hours = Some(u32::MAX);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_server_addr() {
        let mut config = Config::default();
        config.server.port = 8123;
        assert_eq!(config.server_addr(), SocketAddr::from(([127, 0, 0, 1], 8123)));
    }
}
