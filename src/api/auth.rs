//! Bearer token extraction from the `X-AuthToken` header

use crate::handlers::SessionError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Header carrying the session token
pub const AUTH_TOKEN_HEADER: &str = "X-AuthToken";

/// Raw session token presented by the caller.
///
/// Extraction only checks that the header is present and non-empty; the
/// token is resolved against the database by the session handler.
#[derive(Debug, Clone)]
pub struct AuthToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthToken
where
    S: Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty());

        match token {
            Some(token) => Ok(AuthToken(token.to_string())),
            None => {
                tracing::debug!("Request without {} header", AUTH_TOKEN_HEADER);
                Err(SessionError::Unauthenticated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> Result<AuthToken, SessionError> {
        let (mut parts, _) = req.into_parts();
        AuthToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_header_present() {
        let req = Request::builder()
            .header(AUTH_TOKEN_HEADER, " abc-123 ")
            .body(())
            .unwrap();
        let AuthToken(token) = extract(req).await.unwrap();
        assert_eq!(token, "abc-123");
    }

    #[tokio::test]
    async fn test_header_lookup_is_case_insensitive() {
        let req = Request::builder()
            .header("x-authtoken", "abc")
            .body(())
            .unwrap();
        assert!(extract(req).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_or_blank_header() {
        let req = Request::builder().body(()).unwrap();
        assert!(matches!(extract(req).await, Err(SessionError::Unauthenticated)));

        let req = Request::builder()
            .header(AUTH_TOKEN_HEADER, "   ")
            .body(())
            .unwrap();
        assert!(matches!(extract(req).await, Err(SessionError::Unauthenticated)));
    }
}
