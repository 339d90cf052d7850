/// Database models for the marketplace
///
/// - `user`: Accounts and platform role
/// - `partner`: Dealerships (the tenant boundary)
/// - `membership`: Partner staff rows with owner/admin/staff roles
/// - `session`: Database-backed sign-in sessions
/// - `verification`: Single-use magic-link records
/// - `vehicle`: Marketplace listings
///
/// All queries are runtime-checked `sqlx` queries against PostgreSQL.

pub mod membership;
pub mod partner;
pub mod session;
pub mod user;
pub mod vehicle;
pub mod verification;
