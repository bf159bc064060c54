//! HTTP route handlers for the API

use super::auth::AuthToken;
use super::AppState;
use crate::db;
use crate::handlers::{Credentials, DeviceInfo, IssuedToken, RevokeTarget, SessionError};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Health Check
// ============================================================================

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state
        .db
        .with_conn(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false);

    let (status, label) = if db_ok {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(serde_json::json!({
            "status": label,
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

// ============================================================================
// Request decoding
// ============================================================================

/// Query string of `GET /api/user`
#[derive(Debug, Default, Deserialize)]
pub struct ListDevicesQuery {
    #[serde(rename = "self")]
    pub include_self: Option<u8>,
}

/// Query string of `DELETE /api/user`
#[derive(Debug, Default, Deserialize)]
pub struct RevokeDeviceQuery {
    #[serde(rename = "self")]
    pub include_self: Option<u8>,
    pub id: Option<i64>,
}

/// JSON body of sign-in (`POST`) and sign-up (`PUT`)
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsBody {
    pub login: Option<String>,
    pub password: Option<String>,
    pub device: Option<String>,
    /// Expiry as epoch milliseconds
    pub expires: Option<i64>,
}

impl CredentialsBody {
    /// Check required fields and convert `expires` into a timestamp
    pub fn validate(self, now: DateTime<Utc>) -> Result<Credentials, SessionError> {
        let login = required_trimmed(self.login, "login")?;
        let device = required_trimmed(self.device, "device")?;
        let password = match self.password {
            Some(p) if !p.is_empty() => p,
            _ => return Err(SessionError::BadRequest("password is required".to_string())),
        };

        let expires_at = match self.expires {
            None => None,
            Some(ms) => {
                let at = DateTime::from_timestamp_millis(ms)
                    .filter(|at| db::is_storable(*at))
                    .ok_or_else(|| {
                        SessionError::BadRequest("expires is out of range".to_string())
                    })?;
                if at <= now {
                    return Err(SessionError::BadRequest(
                        "expires must be in the future".to_string(),
                    ));
                }
                Some(at)
            }
        };

        Ok(Credentials {
            login,
            password,
            device,
            expires_at,
        })
    }
}

fn required_trimmed(value: Option<String>, field: &str) -> Result<String, SessionError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(SessionError::BadRequest(format!("{field} is required"))),
    }
}

/// The `self` flag: absent means 0, anything other than 0 or 1 is rejected
fn parse_self_flag(value: Option<u8>) -> Result<bool, SessionError> {
    match value.unwrap_or(0) {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(SessionError::BadRequest(format!(
            "self must be 0 or 1, got {other}"
        ))),
    }
}

fn decode_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, SessionError> {
    query
        .map(|Query(q)| q)
        .map_err(|rejection| SessionError::BadRequest(rejection.body_text()))
}

fn decode_body(body: Result<Json<CredentialsBody>, JsonRejection>) -> Result<Credentials, SessionError> {
    let Json(body) = body.map_err(|rejection| SessionError::BadRequest(rejection.body_text()))?;
    body.validate(Utc::now())
}

// ============================================================================
// Sessions resource
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<DeviceInfo>,
}

/// GET /api/user?self=0|1
/// Lists the caller's devices, newest first
pub async fn list_devices(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    query: Result<Query<ListDevicesQuery>, QueryRejection>,
) -> Result<Json<DevicesResponse>, SessionError> {
    let query = decode_query(query)?;
    let include_self = parse_self_flag(query.include_self)?;

    let devices = state.sessions.list_sessions(token, include_self).await?;
    Ok(Json(DevicesResponse { devices }))
}

/// POST /api/user
/// Sign in: issues a new token for an existing user
pub async fn sign_in(
    State(state): State<AppState>,
    body: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<Json<IssuedToken>, SessionError> {
    let creds = decode_body(body)?;
    let issued = state.sessions.sign_in(creds).await?;
    Ok(Json(issued))
}

/// PUT /api/user
/// Sign up: creates the user and its first token
pub async fn sign_up(
    State(state): State<AppState>,
    body: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<Json<IssuedToken>, SessionError> {
    let creds = decode_body(body)?;
    let issued = state.sessions.sign_up(creds).await?;
    Ok(Json(issued))
}

/// DELETE /api/user?self=0|1&id=N
/// Revokes the caller's own token (`self=1`) or one of its devices by id
pub async fn revoke_device(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    query: Result<Query<RevokeDeviceQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, SessionError> {
    let query = decode_query(query)?;
    let target = if parse_self_flag(query.include_self)? {
        RevokeTarget::Current
    } else {
        RevokeTarget::ById(query.id)
    };

    state.sessions.revoke(token, target).await?;
    Ok(Json(serde_json::json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn body(login: &str, password: &str, device: &str) -> CredentialsBody {
        CredentialsBody {
            login: Some(login.to_string()),
            password: Some(password.to_string()),
            device: Some(device.to_string()),
            expires: None,
        }
    }

    #[test]
    fn test_self_flag() {
        assert!(!parse_self_flag(None).unwrap());
        assert!(!parse_self_flag(Some(0)).unwrap());
        assert!(parse_self_flag(Some(1)).unwrap());
        assert!(matches!(
            parse_self_flag(Some(2)),
            Err(SessionError::BadRequest(_))
        ));
    }

    #[test]
    fn test_validate_trims_login_and_device() {
        let creds = body("  alice ", " pw ", " phone\n").validate(Utc::now()).unwrap();
        assert_eq!(creds.login, "alice");
        assert_eq!(creds.device, "phone");
        assert_eq!(creds.password, " pw ");
        assert!(creds.expires_at.is_none());
    }

    #[test]
    fn test_validate_missing_fields() {
        let now = Utc::now();
        for (b, field) in [
            (CredentialsBody { login: None, ..body("a", "p", "d") }, "login"),
            (CredentialsBody { device: Some("  ".into()), ..body("a", "p", "d") }, "device"),
            (CredentialsBody { password: Some(String::new()), ..body("a", "p", "d") }, "password"),
        ] {
            match b.validate(now) {
                Err(SessionError::BadRequest(msg)) => assert!(msg.starts_with(field), "{msg}"),
                other => panic!("expected BadRequest for {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_validate_expires() {
        let now = Utc::now();

        let future = (now + Duration::hours(1)).timestamp_millis();
        let creds = CredentialsBody { expires: Some(future), ..body("a", "p", "d") }
            .validate(now)
            .unwrap();
        assert_eq!(creds.expires_at.unwrap().timestamp_millis(), future);

        let past = (now - Duration::hours(1)).timestamp_millis();
        assert!(CredentialsBody { expires: Some(past), ..body("a", "p", "d") }
            .validate(now)
            .is_err());

        assert!(CredentialsBody { expires: Some(i64::MAX), ..body("a", "p", "d") }
            .validate(now)
            .is_err());
    }

    #[test]
    fn test_validate_rejects_expires_past_year_9999() {
        let now = Utc::now();

        let last = CredentialsBody {
            expires: Some(db::MAX_TIMESTAMP_MILLIS),
            ..body("a", "p", "d")
        }
        .validate(now)
        .unwrap();
        assert_eq!(
            last.expires_at.unwrap().timestamp_millis(),
            db::MAX_TIMESTAMP_MILLIS
        );

        // 10000-01-01T00:00:00Z
        let err = CredentialsBody {
            expires: Some(253_402_300_800_000),
            ..body("a", "p", "d")
        }
        .validate(now)
        .unwrap_err();
        assert!(matches!(err, SessionError::BadRequest(_)));
    }
}
