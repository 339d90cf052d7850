/// Password hashing with Argon2id
///
/// Hashes are stored as PHC strings, so parameters travel with the hash and
/// can be raised later without invalidating existing accounts.
///
/// # Example
///
/// ```
/// use alifh_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("correct horse battery")?;
/// assert!(verify_password("correct horse battery", &hash)?);
/// assert!(!verify_password("wrong", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Shortest accepted password
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Longest accepted password
pub const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordParams {
    /// Memory in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordParams {
    /// OWASP baseline for Argon2id: 19 MiB, 2 iterations, 1 lane
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl PasswordParams {
    fn hasher(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| PasswordError::HashError(format!("invalid parameters: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hashes with the default parameters
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with(password, PasswordParams::default())
}

pub fn hash_password_with(password: &str, params: PasswordParams) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    params
        .hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Checks `password` against a stored PHC string.
///
/// Returns `Ok(false)` on mismatch and `Err` only when the stored hash is
/// malformed. Parameters are read from the hash itself.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;
    if parsed.salt.is_none() || parsed.hash.is_none() {
        return Err(PasswordError::InvalidHash("missing salt or hash output".to_string()));
    }

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::InvalidHash(e.to_string())),
    }
}

/// Length policy applied on sign-up and password changes
pub fn validate_password_length(password: &str) -> Result<(), String> {
    let len = password.chars().count();

    if len < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at most {} characters long",
            MAX_PASSWORD_LENGTH
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordParams {
        PasswordParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_hash_is_argon2id_phc() {
        let hash = hash_password("showroom-key").expect("hash");
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=19456,t=2,p=1"));
    }

    #[test]
    fn test_same_password_different_salts() {
        let a = hash_password_with("same", cheap()).unwrap();
        let b = hash_password_with("same", cheap()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify() {
        let hash = hash_password_with("dealer-password", cheap()).unwrap();
        assert!(verify_password("dealer-password", &hash).unwrap());
        assert!(!verify_password("dealer-passwore", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_reads_params_from_hash() {
        let hash = hash_password_with("unicode-كلمة-السر", cheap()).unwrap();
        assert!(hash.contains("m=1024,t=1,p=1"));
        assert!(verify_password("unicode-كلمة-السر", &hash).unwrap());
    }

    #[test]
    fn test_verify_malformed_hash() {
        assert!(verify_password("x", "not-a-hash").is_err());
        // Parses as a PHC string but carries no hash output
        assert!(verify_password("x", "$argon2id$broken").is_err());
        assert!(verify_password("x", "$argon2id$v=19$m=1024,t=1,p=1").is_err());
    }

    #[test]
    fn test_password_length_policy() {
        assert!(validate_password_length("12345678").is_ok());
        assert!(validate_password_length(&"p".repeat(128)).is_ok());

        let short = validate_password_length("1234567").unwrap_err();
        assert!(short.contains("at least 8"));

        let long = validate_password_length(&"p".repeat(129)).unwrap_err();
        assert!(long.contains("at most 128"));
    }
}
