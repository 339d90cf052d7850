/// Opaque session tokens and the cookie that carries them
///
/// # Format
///
/// `alifh_` followed by 48 base62 characters (54 chars total). The plaintext
/// token is handed to the client once; the database stores the SHA-256 hex
/// digest.
///
/// # Transport
///
/// Browsers send the token in the `alifh.session_token` cookie. API clients
/// may send `Authorization: Bearer <token>` instead; the cookie wins when both
/// are present.
///
/// # Example
///
/// ```
/// use alifh_shared::auth::session_token::{generate_session_token, hash_session_token, is_valid_format};
///
/// let (token, hash) = generate_session_token();
/// assert!(is_valid_format(&token));
/// assert_eq!(hash, hash_session_token(&token));
/// ```

use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

/// Cookie carrying the session token
pub const SESSION_COOKIE_NAME: &str = "alifh.session_token";

const TOKEN_PREFIX: &str = "alifh_";
const TOKEN_RANDOM_LENGTH: usize = 48;

/// Total token length
pub const SESSION_TOKEN_LENGTH: usize = TOKEN_PREFIX.len() + TOKEN_RANDOM_LENGTH;

/// Returns `(plaintext_token, sha256_hex)`
pub fn generate_session_token() -> (String, String) {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_RANDOM_LENGTH)
        .map(char::from)
        .collect();

    let token = format!("{}{}", TOKEN_PREFIX, random);
    let hash = hash_session_token(&token);
    (token, hash)
}

pub fn hash_session_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Cheap shape check before touching the database
pub fn is_valid_format(token: &str) -> bool {
    token.len() == SESSION_TOKEN_LENGTH
        && token.starts_with(TOKEN_PREFIX)
        && token[TOKEN_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
}

/// Finds a cookie value in a raw `Cookie` header
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

/// Picks the session token from the `Cookie` header, falling back to a
/// bearer `Authorization` header. Malformed tokens are ignored.
pub fn extract_token<'a>(
    cookie_header: Option<&'a str>,
    authorization_header: Option<&'a str>,
) -> Option<&'a str> {
    let from_cookie = cookie_header.and_then(|h| cookie_value(h, SESSION_COOKIE_NAME));
    let from_bearer = authorization_header.and_then(|h| h.strip_prefix("Bearer ")).map(str::trim);

    from_cookie
        .filter(|t| is_valid_format(t))
        .or_else(|| from_bearer.filter(|t| is_valid_format(t)))
}

/// `Set-Cookie` value for a new session
pub fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE_NAME, token, max_age_seconds
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_format() {
        let (token, hash) = generate_session_token();
        assert!(token.starts_with("alifh_"));
        assert_eq!(token.len(), SESSION_TOKEN_LENGTH);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_unique() {
        let (a, _) = generate_session_token();
        let (b, _) = generate_session_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_known_value() {
        assert_eq!(
            hash_session_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_is_valid_format() {
        let (token, _) = generate_session_token();
        assert!(is_valid_format(&token));
        assert!(!is_valid_format("alifh_short"));
        assert!(!is_valid_format(&format!("other_{}", "a".repeat(48))));
        assert!(!is_valid_format(&format!("alifh_{}!", "a".repeat(47))));
    }

    #[test]
    fn test_cookie_value() {
        let header = "theme=dark; alifh.session_token=abc123; other=1";
        assert_eq!(cookie_value(header, SESSION_COOKIE_NAME), Some("abc123"));
        assert_eq!(cookie_value(header, "theme"), Some("dark"));
        assert_eq!(cookie_value(header, "missing"), None);
        assert_eq!(cookie_value("", "theme"), None);
    }

    #[test]
    fn test_extract_token_prefers_cookie() {
        let (cookie_token, _) = generate_session_token();
        let (bearer_token, _) = generate_session_token();
        let cookie = format!("{}={}", SESSION_COOKIE_NAME, cookie_token);
        let bearer = format!("Bearer {}", bearer_token);

        assert_eq!(
            extract_token(Some(&cookie), Some(&bearer)),
            Some(cookie_token.as_str())
        );
        assert_eq!(extract_token(None, Some(&bearer)), Some(bearer_token.as_str()));
        assert_eq!(extract_token(None, None), None);
    }

    #[test]
    fn test_extract_token_ignores_malformed() {
        let (bearer_token, _) = generate_session_token();
        let bad_cookie = format!("{}=garbage", SESSION_COOKIE_NAME);
        let bearer = format!("Bearer {}", bearer_token);

        assert_eq!(
            extract_token(Some(&bad_cookie), Some(&bearer)),
            Some(bearer_token.as_str())
        );
        assert_eq!(extract_token(Some(&bad_cookie), Some("Basic abc")), None);
    }

    #[test]
    fn test_session_cookie() {
        let cookie = session_cookie("tok", 604_800, false);
        assert_eq!(
            cookie,
            "alifh.session_token=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=604800"
        );
        assert!(session_cookie("tok", 10, true).ends_with("; Secure"));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }
}
