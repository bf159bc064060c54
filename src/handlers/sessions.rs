//! Session handling logic
//!
//! Sign-up, sign-in, device listing and revocation. Nothing here knows about
//! HTTP; the API layer decodes requests into the types below and maps
//! [`SessionError`] onto status codes.

use crate::auth;
use crate::config::AuthConfig;
use crate::db::tokens::{self, NewToken, Token};
use crate::db::{self, users, Database};
use crate::error::CoreError;
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;

/// Failure outcome of a session operation
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Request field missing or out of range
    #[error("{0}")]
    BadRequest(String),

    /// Missing, unknown or expired bearer token
    #[error("Invalid or expired token")]
    Unauthenticated,

    /// Sign-in with an unknown login or a wrong password
    #[error("No such user or password invalid")]
    InvalidCredentials,

    /// Revocation target does not exist
    #[error("Invalid device id")]
    InvalidTarget,

    /// Revocation target belongs to another user
    #[error("Invalid token")]
    Forbidden,

    /// Sign-up with a login that already exists
    #[error("Login already taken")]
    LoginTaken,

    /// Storage or hashing failure; the detail is logged, never returned
    #[error(transparent)]
    Internal(#[from] CoreError),
}

impl From<rusqlite::Error> for SessionError {
    fn from(e: rusqlite::Error) -> Self {
        SessionError::Internal(CoreError::Database(e))
    }
}

/// Validated sign-in / sign-up input
#[derive(Debug, Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
    pub device: String,
    /// Requested expiry; `None` falls back to the configured default TTL
    pub expires_at: Option<DateTime<Utc>>,
}

/// Which token a revocation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeTarget {
    /// The caller's own token
    Current,
    /// A token row by id; `None` when the client sent no id
    ById(Option<i64>),
}

/// A freshly issued bearer token. The raw string is never stored.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
}

/// One entry in a device listing
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: i64,
    pub device: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// True for the token that made the request
    pub current: bool,
}

/// Session handler for business logic
#[derive(Clone)]
pub struct SessionHandler {
    db: Database,
    auth: Arc<AuthConfig>,
}

impl SessionHandler {
    pub fn new(db: Database, auth: AuthConfig) -> Self {
        SessionHandler {
            db,
            auth: Arc::new(auth),
        }
    }

    /// List the caller's devices, newest first.
    ///
    /// The caller's own token is left out unless `include_self` is set.
    pub async fn list_sessions(
        &self,
        raw_token: String,
        include_self: bool,
    ) -> Result<Vec<DeviceInfo>, SessionError> {
        let now = Utc::now();
        self.db
            .with_conn(move |conn| {
                let caller = authenticate(conn, &raw_token, now)?;
                let devices: Vec<DeviceInfo> = tokens::list_tokens_for_user(conn, caller.user_id, now)?
                    .into_iter()
                    .filter(|t| include_self || t.id != caller.id)
                    .map(|t| DeviceInfo {
                        current: t.id == caller.id,
                        id: t.id,
                        device: t.device,
                        created_at: t.created_at,
                        expires_at: t.expires_at,
                    })
                    .collect();
                Ok::<_, SessionError>(devices)
            })
            .await?
    }

    /// Issue a new token for an existing user
    pub async fn sign_in(&self, creds: Credentials) -> Result<IssuedToken, SessionError> {
        let login = creds.login.clone();
        let user = self
            .db
            .with_conn(move |conn| users::find_user_by_login(conn, &login))
            .await??;

        let Some(user) = user else {
            let pepper = self.auth.pepper.clone();
            let password = creds.password.clone();
            tokio::task::spawn_blocking(move || {
                auth::dummy_verify(&password, pepper.as_deref())
            })
            .await
            .map_err(CoreError::from)?;
            tracing::info!("Sign-in failed: unknown login {:?}", creds.login);
            return Err(SessionError::InvalidCredentials);
        };

        let pepper = self.auth.pepper.clone();
        let password = creds.password.clone();
        let stored_hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || {
            auth::verify_password(&password, &stored_hash, pepper.as_deref())
        })
        .await
        .map_err(CoreError::from)??;

        if !matches {
            tracing::info!("Sign-in failed: wrong password for {:?}", creds.login);
            return Err(SessionError::InvalidCredentials);
        }

        let expires_at = self.effective_expiry(creds.expires_at)?;
        let device = creds.device;
        let user_id = user.id;
        let (token_id, issued) = self
            .db
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let issued = create_token(&tx, user_id, &device, expires_at)?;
                tx.commit()?;
                Ok::<_, SessionError>(issued)
            })
            .await??;

        tracing::info!("Created token {} for user {}", token_id, user.id);
        Ok(issued)
    }

    /// Register a user and issue its first token in one transaction
    pub async fn sign_up(&self, creds: Credentials) -> Result<IssuedToken, SessionError> {
        if creds.password.chars().count() < self.auth.min_password_length {
            return Err(SessionError::BadRequest(format!(
                "password must be at least {} characters",
                self.auth.min_password_length
            )));
        }

        let expires_at = self.effective_expiry(creds.expires_at)?;
        let pepper = self.auth.pepper.clone();
        let password = creds.password;
        let password_hash =
            tokio::task::spawn_blocking(move || auth::hash_password(&password, pepper.as_deref()))
                .await
                .map_err(CoreError::from)??;

        let login = creds.login;
        let device = creds.device;
        let (user_id, (token_id, issued)) = self
            .db
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let user_id = users::insert_user(&tx, &login, &password_hash, Utc::now())
                    .map_err(|e| {
                        if users::is_unique_violation(&e) {
                            SessionError::LoginTaken
                        } else {
                            SessionError::from(e)
                        }
                    })?;
                let issued = create_token(&tx, user_id, &device, expires_at)?;
                tx.commit()?;
                Ok::<_, SessionError>((user_id, issued))
            })
            .await??;

        tracing::info!("Registered user {} with token {}", user_id, token_id);
        Ok(issued)
    }

    /// Delete one of the caller's tokens
    pub async fn revoke(&self, raw_token: String, target: RevokeTarget) -> Result<(), SessionError> {
        let now = Utc::now();
        let (caller_user, removed) = self
            .db
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let caller = authenticate(&tx, &raw_token, now)?;

                let victim = match target {
                    RevokeTarget::Current => Some(caller.clone()),
                    RevokeTarget::ById(Some(id)) => tokens::find_token_by_id(&tx, id)?,
                    RevokeTarget::ById(None) => None,
                };
                let victim = victim.ok_or(SessionError::InvalidTarget)?;

                if victim.user_id != caller.user_id {
                    tracing::warn!(
                        "User {} tried to revoke token {} owned by user {}",
                        caller.user_id,
                        victim.id,
                        victim.user_id
                    );
                    return Err(SessionError::Forbidden);
                }

                tokens::delete_token(&tx, victim.id)?;
                tx.commit()?;
                Ok::<_, SessionError>((caller.user_id, victim.id))
            })
            .await??;

        tracing::info!("User {} revoked token {}", caller_user, removed);
        Ok(())
    }

    fn effective_expiry(
        &self,
        requested: Option<DateTime<Utc>>,
    ) -> Result<Option<DateTime<Utc>>, CoreError> {
        let Some(hours) = self.auth.default_token_ttl_hours.filter(|_| requested.is_none()) else {
            return Ok(requested);
        };
        Utc::now()
            .checked_add_signed(Duration::hours(i64::from(hours)))
            .filter(|at| db::is_storable(*at))
            .map(Some)
            .ok_or_else(|| {
                CoreError::Config(format!(
                    "auth.default_token_ttl_hours = {hours} is out of range"
                ))
            })
    }
}

/// Resolve a raw bearer token to its live row
fn authenticate(conn: &Connection, raw_token: &str, now: DateTime<Utc>) -> Result<Token, SessionError> {
    match tokens::find_token_by_hash(conn, &auth::hash_token(raw_token))? {
        Some(token) if !token.is_expired(now) => Ok(token),
        Some(token) => {
            tracing::debug!("Rejected expired token {}", token.id);
            Err(SessionError::Unauthenticated)
        }
        None => Err(SessionError::Unauthenticated),
    }
}

/// Insert a new random token for `user_id`, returning its row id and raw string
fn create_token(
    conn: &Connection,
    user_id: i64,
    device: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(i64, IssuedToken), SessionError> {
    let raw = auth::generate_token();
    let token_hash = auth::hash_token(&raw);
    let id = tokens::insert_token(
        conn,
        &NewToken {
            token_hash: &token_hash,
            user_id,
            device,
            created_at: Utc::now(),
            expires_at,
        },
    )?;
    Ok((id, IssuedToken { token: raw }))
}
