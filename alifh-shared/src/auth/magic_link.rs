/// Magic-link sign-in tokens
///
/// A magic link carries an HS256 JWT whose `jti` is the id of a row in
/// `verifications`. The signature and expiry are checked here; single use is
/// enforced by consuming that row (see `models::verification`).
///
/// # Claims
///
/// - `sub`: normalized email the link was issued for
/// - `jti`: verification row id
/// - `iss`: always `alifh`
/// - `purpose`: always `magic_link`, so session or other tokens signed with
///   the same secret are never accepted here
/// - `iat`, `nbf`, `exp`: Unix timestamps
///
/// # Example
///
/// ```
/// use alifh_shared::auth::magic_link::{create_token, validate_token, MagicLinkClaims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "an-auth-secret-that-is-at-least-32-bytes";
/// let claims = MagicLinkClaims::new("buyer@example.com", Uuid::new_v4(), Duration::minutes(5));
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret)?;
/// assert_eq!(validated.sub, "buyer@example.com");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim
pub const ISSUER: &str = "alifh";

/// Purpose claim
pub const PURPOSE: &str = "magic_link";

/// Path of the verification endpoint
pub const VERIFY_PATH: &str = "/api/auth/magic-link/verify";

/// Default link lifetime
pub const DEFAULT_TTL_MINUTES: i64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum MagicLinkError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Magic link has expired")]
    Expired,

    #[error("Invalid magic link: {0}")]
    Invalid(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MagicLinkClaims {
    pub sub: String,
    pub jti: Uuid,
    pub iss: String,
    pub purpose: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl MagicLinkClaims {
    pub fn new(email: impl Into<String>, verification_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: email.into(),
            jti: verification_id,
            iss: ISSUER.to_string(),
            purpose: PURPOSE.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

pub fn create_token(claims: &MagicLinkClaims, secret: &str) -> Result<String, MagicLinkError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| MagicLinkError::CreateError(e.to_string()))
}

/// Checks signature, issuer, `exp`, `nbf` and the purpose claim
pub fn validate_token(token: &str, secret: &str) -> Result<MagicLinkClaims, MagicLinkError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_nbf = true;
    validation.leeway = 0;

    let data = decode::<MagicLinkClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => MagicLinkError::Expired,
        _ => MagicLinkError::Invalid(e.to_string()),
    })?;

    if data.claims.purpose != PURPOSE {
        return Err(MagicLinkError::Invalid(format!(
            "unexpected purpose {}",
            data.claims.purpose
        )));
    }

    Ok(data.claims)
}

/// Only same-origin relative paths are honoured as post-sign-in redirects.
/// Anything else (absolute URLs, protocol-relative `//host`, backslash
/// tricks) is dropped.
pub fn sanitize_callback_url(callback: Option<&str>) -> Option<String> {
    let callback = callback?.trim();

    let is_relative_path = callback.starts_with('/')
        && !callback.starts_with("//")
        && !callback.contains('\\')
        && !callback.chars().any(char::is_control);

    is_relative_path.then(|| callback.to_string())
}

/// Full verification URL sent to the user
pub fn build_link(
    base_url: &str,
    token: &str,
    callback_url: Option<&str>,
) -> Result<String, MagicLinkError> {
    let base = Url::parse(base_url).map_err(|e| MagicLinkError::InvalidBaseUrl(e.to_string()))?;
    let mut url = base
        .join(VERIFY_PATH)
        .map_err(|e| MagicLinkError::InvalidBaseUrl(e.to_string()))?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("token", token);
        if let Some(callback) = callback_url {
            query.append_pair("callbackURL", callback);
        }
    }

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-auth-secret-with-at-least-32-bytes!";

    #[test]
    fn test_roundtrip_claims() {
        let id = Uuid::new_v4();
        let claims = MagicLinkClaims::new("buyer@example.com", id, Duration::minutes(5));
        let token = create_token(&claims, SECRET).unwrap();

        let validated = validate_token(&token, SECRET).unwrap();
        assert_eq!(validated, claims);
        assert_eq!(validated.jti, id);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = MagicLinkClaims::new("a@b.co", Uuid::new_v4(), Duration::minutes(5));
        let token = create_token(&claims, SECRET).unwrap();

        let err = validate_token(&token, "another-secret-that-is-32-bytes-long").unwrap_err();
        assert!(matches!(err, MagicLinkError::Invalid(_)));
    }

    #[test]
    fn test_expired_rejected() {
        let claims = MagicLinkClaims::new("a@b.co", Uuid::new_v4(), Duration::minutes(-10));
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(validate_token(&token, SECRET), Err(MagicLinkError::Expired)));
    }

    #[test]
    fn test_wrong_purpose_rejected() {
        let mut claims = MagicLinkClaims::new("a@b.co", Uuid::new_v4(), Duration::minutes(5));
        claims.purpose = "session".to_string();
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(validate_token(&token, SECRET), Err(MagicLinkError::Invalid(_))));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let mut claims = MagicLinkClaims::new("a@b.co", Uuid::new_v4(), Duration::minutes(5));
        claims.iss = "someone-else".to_string();
        let token = create_token(&claims, SECRET).unwrap();

        assert!(validate_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            validate_token("not.a.token", SECRET),
            Err(MagicLinkError::Invalid(_))
        ));
    }

    #[test]
    fn test_sanitize_callback_url() {
        assert_eq!(sanitize_callback_url(Some("/partner/owner")), Some("/partner/owner".to_string()));
        assert_eq!(sanitize_callback_url(Some("/listings?make=bmw")), Some("/listings?make=bmw".to_string()));
        assert_eq!(sanitize_callback_url(Some("https://evil.example")), None);
        assert_eq!(sanitize_callback_url(Some("//evil.example")), None);
        assert_eq!(sanitize_callback_url(Some("/\\evil.example")), None);
        assert_eq!(sanitize_callback_url(Some("dashboard")), None);
        assert_eq!(sanitize_callback_url(None), None);
    }

    #[test]
    fn test_build_link() {
        let link = build_link("https://alifh.com", "abc.def.ghi", Some("/partner/staff")).unwrap();
        assert_eq!(
            link,
            "https://alifh.com/api/auth/magic-link/verify?token=abc.def.ghi&callbackURL=%2Fpartner%2Fstaff"
        );

        let link = build_link("http://localhost:8080/", "t", None).unwrap();
        assert_eq!(link, "http://localhost:8080/api/auth/magic-link/verify?token=t");
    }

    #[test]
    fn test_build_link_invalid_base() {
        assert!(matches!(
            build_link("not a url", "t", None),
            Err(MagicLinkError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_expires_at() {
        let claims = MagicLinkClaims::new("a@b.co", Uuid::new_v4(), Duration::minutes(5));
        assert_eq!(claims.expires_at().timestamp(), claims.exp);
    }
}
