/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and length policy
/// - [`session_token`]: opaque session tokens, cookie parsing and `Set-Cookie` values
/// - [`magic_link`]: signed single-use sign-in links
/// - [`delivery`]: where magic links go (log or webhook)
/// - [`middleware`]: resolving a request's token into an [`middleware::AuthSession`]
/// - [`authorization`]: platform-admin and partner-role checks
///
/// # Example
///
/// ```
/// use alifh_shared::auth::password::{hash_password, verify_password};
/// use alifh_shared::auth::session_token::{generate_session_token, hash_session_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let (token, token_hash) = generate_session_token();
/// assert_eq!(hash_session_token(&token), token_hash);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod delivery;
pub mod magic_link;
pub mod middleware;
pub mod password;
pub mod session_token;
