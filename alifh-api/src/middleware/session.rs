/// Session middleware and extractors
///
/// [`session_layer`] runs on every request: it picks the session token from
/// the `alifh.session_token` cookie (or a bearer header), resolves it and
/// stores the result as a [`CurrentSession`] extension. Handlers then use one
/// of the extractors:
///
/// - [`MaybeAuth`]: `Option<AuthSession>`, never rejects
/// - [`AuthUser`]: rejects with 401 JSON when nobody is signed in
/// - [`PlatformAdmin`]: additionally rejects with 403 unless `isAlifhAdmin`
///
/// A database failure while resolving the session aborts the request with a
/// logged 500.

use alifh_shared::auth::{
    authorization::require_platform_admin,
    middleware::{resolve_session, AuthSession},
    session_token::extract_token,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{app::AppState, error::ApiError};

/// Resolved session for the current request
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Option<AuthSession>);

/// Session token presented with the request, if well-formed
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookie = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    extract_token(cookie, authorization).map(str::to_string)
}

/// Client address as reported by the reverse proxy
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn session_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = match token_from_headers(req.headers()) {
        Some(token) => resolve_session(&state.db, &token, &state.session_settings)
            .await
            .map_err(|e| ApiError::InternalError(format!("Failed to resolve session: {}", e)))?,
        None => None,
    };

    if let Some(auth) = &session {
        tracing::debug!(user_id = %auth.user.id, "Request authenticated");
    }

    req.extensions_mut().insert(CurrentSession(session));
    Ok(next.run(req).await)
}

fn current(parts: &Parts) -> Option<AuthSession> {
    parts
        .extensions
        .get::<CurrentSession>()
        .and_then(|current| current.0.clone())
}

/// Session if one was presented
#[derive(Debug, Clone)]
pub struct MaybeAuth(pub Option<AuthSession>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(current(parts)))
    }
}

/// Signed-in user, or 401
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthSession);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current(parts)
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// Platform administrator, or 401/403
#[derive(Debug, Clone)]
pub struct PlatformAdmin(pub AuthSession);

#[async_trait]
impl<S> FromRequestParts<S> for PlatformAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(auth) = AuthUser::from_request_parts(parts, state).await?;
        require_platform_admin(&auth.access)?;
        Ok(PlatformAdmin(auth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alifh_shared::auth::session_token::generate_session_token;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_from_headers() {
        let (token, _) = generate_session_token();
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; alifh.session_token={}", token)).unwrap(),
        );
        assert_eq!(token_from_headers(&headers), Some(token));
    }

    #[test]
    fn test_client_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), None);

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.9"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }
}
