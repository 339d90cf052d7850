//! # Alifh Shared Library
//!
//! Shared types, persistence and authentication primitives used by the Alifh
//! marketplace API server and the maintenance CLI.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool, migrations and maintenance SQL
//! - `models`: Database models (users, partners, memberships, sessions, vehicles)
//! - `auth`: Passwords, session tokens, magic links, session resolution, authorization
//! - `dashboard`: Role-to-dashboard resolution and role gates

pub mod auth;
pub mod dashboard;
pub mod db;
pub mod models;

/// Current version of the Alifh shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
