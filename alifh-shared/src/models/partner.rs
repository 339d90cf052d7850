/// Partners (dealerships selling on the marketplace)
///
/// A partner is the tenant boundary: vehicles and staff memberships belong to
/// exactly one partner. The platform itself is modelled as a partner too (slug
/// `alifh` by default) so its owners and admins can be resolved with the same
/// membership query.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE partners (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     slug VARCHAR(64) NOT NULL UNIQUE,
///     status partner_status NOT NULL DEFAULT 'pending',
///     contact_email VARCHAR(255),
///     phone VARCHAR(64),
///     city VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Minimum slug length
pub const SLUG_MIN_LEN: usize = 2;

/// Maximum slug length (matches the column width)
pub const SLUG_MAX_LEN: usize = 64;

/// Lifecycle of a partner account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "partner_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PartnerStatus {
    /// Awaiting platform approval
    Pending,

    /// Live on the marketplace
    Active,

    /// Blocked by the platform; staff lose partner access
    Suspended,
}

impl PartnerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartnerStatus::Pending => "pending",
            PartnerStatus::Active => "active",
            PartnerStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(PartnerStatus::Pending),
            "active" => Some(PartnerStatus::Active),
            "suspended" => Some(PartnerStatus::Suspended),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Partner {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub status: PartnerStatus,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePartner {
    pub name: String,

    /// Derived from `name` when absent
    pub slug: Option<String>,

    #[serde(default = "default_status")]
    pub status: PartnerStatus,

    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
}

fn default_status() -> PartnerStatus {
    PartnerStatus::Pending
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePartner {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
}

/// Builds a URL slug: lower-case ASCII alphanumerics separated by single
/// dashes, truncated to [`SLUG_MAX_LEN`].
///
/// ```
/// use alifh_shared::models::partner::slugify;
///
/// assert_eq!(slugify("  Desert Motors & Sons "), "desert-motors-sons");
/// ```
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > SLUG_MAX_LEN {
        slug.truncate(SLUG_MAX_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    slug
}

/// True when `slug` is already in canonical slug form and within bounds
pub fn is_valid_slug(slug: &str) -> bool {
    (SLUG_MIN_LEN..=SLUG_MAX_LEN).contains(&slug.len()) && slugify(slug) == slug
}

const PARTNER_COLUMNS: &str =
    "id, name, slug, status, contact_email, phone, city, created_at, updated_at";

impl Partner {
    pub fn is_active(&self) -> bool {
        self.status == PartnerStatus::Active
    }

    /// Inserts a partner. The caller validates an explicit slug; a missing
    /// slug is derived from the name.
    ///
    /// # Errors
    ///
    /// Fails with a unique violation (`partners_slug_key`) when the slug is taken.
    pub async fn create(pool: &PgPool, data: CreatePartner) -> Result<Self, sqlx::Error> {
        let slug = data.slug.unwrap_or_else(|| slugify(&data.name));
        let sql = format!(
            "INSERT INTO partners (name, slug, status, contact_email, phone, city) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PARTNER_COLUMNS}"
        );

        sqlx::query_as::<_, Partner>(&sql)
            .bind(data.name)
            .bind(slug)
            .bind(data.status)
            .bind(data.contact_email)
            .bind(data.phone)
            .bind(data.city)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {PARTNER_COLUMNS} FROM partners WHERE id = $1");

        sqlx::query_as::<_, Partner>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {PARTNER_COLUMNS} FROM partners WHERE slug = $1");

        sqlx::query_as::<_, Partner>(&sql)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdatePartner,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE partners SET name = COALESCE($2, name), \
             contact_email = COALESCE($3, contact_email), phone = COALESCE($4, phone), \
             city = COALESCE($5, city), updated_at = NOW() \
             WHERE id = $1 RETURNING {PARTNER_COLUMNS}"
        );

        sqlx::query_as::<_, Partner>(&sql)
            .bind(id)
            .bind(data.name)
            .bind(data.contact_email)
            .bind(data.phone)
            .bind(data.city)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: PartnerStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE partners SET status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {PARTNER_COLUMNS}"
        );

        sqlx::query_as::<_, Partner>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Deletes the partner; memberships and vehicles cascade
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM partners WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Alphabetical by name
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {PARTNER_COLUMNS} FROM partners ORDER BY name ASC LIMIT $1 OFFSET $2"
        );

        sqlx::query_as::<_, Partner>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM partners")
            .fetch_one(pool)
            .await
    }

    pub async fn count_by_status(
        pool: &PgPool,
        status: PartnerStatus,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM partners WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await
    }
}
