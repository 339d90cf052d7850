/// API route handlers
///
/// - `health`: health check
/// - `auth`: email/password and magic-link authentication
/// - `session`: session-extension endpoint with access flags
/// - `dashboards`: role-gated dashboards and redirects
/// - `admin`: platform administration
/// - `partners`: partner members and inventory
/// - `vehicles`: public marketplace listings

pub mod admin;
pub mod auth;
pub mod dashboards;
pub mod health;
pub mod partners;
pub mod session;
pub mod vehicles;

use alifh_shared::models::vehicle::MAX_PAGE_SIZE;
use serde::Deserialize;

/// `?limit=&offset=` for list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// 1..=100, default 50
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
