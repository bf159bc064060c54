//! sessiond - headless service for user sign-up, sign-in and device sessions
//!
//! This crate provides:
//! - SQLite storage for users and per-device bearer tokens
//! - Argon2id password hashing and SHA-256 token digests
//! - An HTTP resource (`/api/user`) to sign up, sign in, list and revoke sessions
//! - A background sweep that purges expired tokens
//!
//! # Usage
//!
//! As a library:
//! ```ignore
//! use sessiond::{Config, Core};
//!
//! let config = Config::from_file("~/.sessiond/config.toml").unwrap();
//! let core = Core::new(config).unwrap();
//! // core.start_api_server().await.unwrap();
//! ```
//!
//! As a standalone server (CLI):
//! ```text
//! sessiond --config ~/.sessiond/config.toml
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod scheduler;

// Re-export main types for convenience
pub use config::Config;
pub use db::Database;
pub use error::{CoreError, Result};
pub use handlers::SessionHandler;

/// Core service that wires configuration, storage and the HTTP API together
pub struct Core {
    /// Configuration
    pub config: Config,

    /// Database handle
    pub db: Database,

    /// Session business logic
    sessions: SessionHandler,
}

impl Core {
    /// Create a new Core instance, opening the database under `data_dir`
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config.db_path();
        tracing::info!("Opening database at {}", db_path.display());
        let db = Database::new(db_path)?;
        Ok(Self::with_database(config, db))
    }

    /// Create a Core instance with an existing database
    pub fn with_database(config: Config, db: Database) -> Self {
        let sessions = SessionHandler::new(db.clone(), config.auth.clone());
        Core {
            config,
            db,
            sessions,
        }
    }

    /// Get the session handler
    pub fn sessions(&self) -> &SessionHandler {
        &self.sessions
    }

    /// Start periodic background tasks (expired token sweep, WAL checkpoint)
    pub fn start_periodic_tasks(&self) {
        scheduler::start_scheduler(&self.config, self.db.clone());
    }

    /// Start the HTTP API server (blocks until shutdown)
    pub async fn start_api_server(&self) -> Result<()> {
        let addr = self.config.server_addr();
        tracing::info!("Starting API server on {}", addr);
        let state = api::AppState::new(self.db.clone(), self.sessions.clone());
        api::serve(addr, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_core_with_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };

        let core = Core::new(config).unwrap();
        assert_eq!(
            core.db.path(),
            Some(dir.path().join("sessiond.db").as_path())
        );

        let creds = handlers::Credentials {
            login: "alice".into(),
            password: "long-enough".into(),
            device: "phone".into(),
            expires_at: None,
        };
        let issued = core.sessions().sign_up(creds).await.unwrap();
        let devices = core.sessions().list_sessions(issued.token, true).await.unwrap();
        assert_eq!(devices.len(), 1);
    }
}
