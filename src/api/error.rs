//! HTTP mapping for session failures
//!
//! Every failure is rendered as `{"state": "fail", "message": ...}`.

use crate::handlers::SessionError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Status code returned for each failure kind
pub fn status_for(err: &SessionError) -> StatusCode {
    match err {
        SessionError::BadRequest(_) | SessionError::InvalidTarget => StatusCode::BAD_REQUEST,
        SessionError::Unauthenticated | SessionError::InvalidCredentials => {
            StatusCode::UNAUTHORIZED
        }
        SessionError::Forbidden => StatusCode::FORBIDDEN,
        SessionError::LoginTaken => StatusCode::CONFLICT,
        SessionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let message = match &self {
            SessionError::Internal(e) => {
                tracing::error!("Session request failed: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(json!({
                "state": "fail",
                "message": message
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&SessionError::InvalidTarget), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&SessionError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_for(&SessionError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(&SessionError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(&SessionError::LoginTaken), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_failure_body() {
        let response = SessionError::InvalidTarget.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["state"], "fail");
        assert_eq!(body["message"], "Invalid device id");
    }

    #[tokio::test]
    async fn test_internal_error_is_not_leaked() {
        let err = SessionError::Internal(CoreError::Hashing("secret detail".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
        assert!(!body.to_string().contains("secret detail"));
    }
}
