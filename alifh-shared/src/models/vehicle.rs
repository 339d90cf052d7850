/// Vehicle listings
///
/// Every listing belongs to one partner. Only `published` listings of
/// non-suspended partners are visible on the public marketplace; partner staff
/// see all of their own listings.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE vehicle_status AS ENUM ('draft', 'published', 'sold', 'archived');
///
/// CREATE TABLE vehicles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     partner_id UUID NOT NULL REFERENCES partners(id) ON DELETE CASCADE,
///     make VARCHAR(100) NOT NULL,
///     model VARCHAR(100) NOT NULL,
///     year INTEGER NOT NULL,
///     price_cents BIGINT NOT NULL,
///     currency VARCHAR(3) NOT NULL DEFAULT 'USD',
///     mileage_km INTEGER,
///     status vehicle_status NOT NULL DEFAULT 'draft',
///     description TEXT,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Largest page the search endpoints return
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "vehicle_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Draft,
    Published,
    Sold,
    Archived,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Draft => "draft",
            VehicleStatus::Published => "published",
            VehicleStatus::Sold => "sold",
            VehicleStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(VehicleStatus::Draft),
            "published" => Some(VehicleStatus::Published),
            "sold" => Some(VehicleStatus::Sold),
            "archived" => Some(VehicleStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price_cents: i64,
    pub currency: String,
    pub mileage_km: Option<i32>,
    pub status: VehicleStatus,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVehicle {
    pub partner_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price_cents: i64,
    pub currency: String,
    pub mileage_km: Option<i32>,
    pub status: VehicleStatus,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateVehicle {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price_cents: Option<i64>,
    pub mileage_km: Option<i32>,
    pub status: Option<VehicleStatus>,
    pub description: Option<String>,
}

/// Public marketplace search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleFilter {
    /// Case-insensitive substring of make or model
    pub query: Option<String>,
    /// Case-insensitive substring of make
    pub make: Option<String>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub min_year: Option<i32>,
    pub partner_slug: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl VehicleFilter {
    /// Page size clamped to 1..=MAX_PAGE_SIZE, default 20
    pub fn page_size(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn page_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Per-status listing counts for one partner
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventorySummary {
    pub draft: i64,
    pub published: i64,
    pub sold: i64,
    pub archived: i64,
}

impl InventorySummary {
    pub fn total(&self) -> i64 {
        self.draft + self.published + self.sold + self.archived
    }

    fn add(&mut self, status: VehicleStatus, count: i64) {
        match status {
            VehicleStatus::Draft => self.draft += count,
            VehicleStatus::Published => self.published += count,
            VehicleStatus::Sold => self.sold += count,
            VehicleStatus::Archived => self.archived += count,
        }
    }
}

const VEHICLE_COLUMNS: &str = "id, partner_id, make, model, year, price_cents, currency, \
                               mileage_km, status, description, created_by, created_at, updated_at";

impl Vehicle {
    pub async fn create(pool: &PgPool, data: CreateVehicle) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO vehicles (partner_id, make, model, year, price_cents, currency, \
             mileage_km, status, description, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {VEHICLE_COLUMNS}"
        );

        sqlx::query_as::<_, Vehicle>(&sql)
            .bind(data.partner_id)
            .bind(data.make)
            .bind(data.model)
            .bind(data.year)
            .bind(data.price_cents)
            .bind(data.currency)
            .bind(data.mileage_km)
            .bind(data.status)
            .bind(data.description)
            .bind(data.created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1");

        sqlx::query_as::<_, Vehicle>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A published listing of a non-suspended partner
    pub async fn find_published(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM vehicles v JOIN partners p ON p.id = v.partner_id \
             WHERE v.id = $1 AND v.status = 'published' AND p.status <> 'suspended'",
            prefixed_columns("v")
        );

        sqlx::query_as::<_, Vehicle>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Updates a listing scoped to its partner
    pub async fn update(
        pool: &PgPool,
        partner_id: Uuid,
        id: Uuid,
        data: UpdateVehicle,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE vehicles SET make = COALESCE($3, make), model = COALESCE($4, model), \
             year = COALESCE($5, year), price_cents = COALESCE($6, price_cents), \
             mileage_km = COALESCE($7, mileage_km), status = COALESCE($8, status), \
             description = COALESCE($9, description), updated_at = NOW() \
             WHERE partner_id = $1 AND id = $2 RETURNING {VEHICLE_COLUMNS}"
        );

        sqlx::query_as::<_, Vehicle>(&sql)
            .bind(partner_id)
            .bind(id)
            .bind(data.make)
            .bind(data.model)
            .bind(data.year)
            .bind(data.price_cents)
            .bind(data.mileage_km)
            .bind(data.status)
            .bind(data.description)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_status(
        pool: &PgPool,
        partner_id: Uuid,
        id: Uuid,
        status: VehicleStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE vehicles SET status = $3, updated_at = NOW() \
             WHERE partner_id = $1 AND id = $2 RETURNING {VEHICLE_COLUMNS}"
        );

        sqlx::query_as::<_, Vehicle>(&sql)
            .bind(partner_id)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, partner_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM vehicles WHERE partner_id = $1 AND id = $2")
            .bind(partner_id)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All listings of a partner, newest first
    pub async fn list_by_partner(
        pool: &PgPool,
        partner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE partner_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );

        sqlx::query_as::<_, Vehicle>(&sql)
            .bind(partner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Public search over published listings
    pub async fn search_published(
        pool: &PgPool,
        filter: &VehicleFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM vehicles v JOIN partners p ON p.id = v.partner_id \
             WHERE v.status = 'published' AND p.status <> 'suspended'",
            prefixed_columns("v")
        ));

        if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
            let pattern = format!("%{}%", escape_like(query.trim()));
            builder
                .push(" AND (v.make ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR v.model ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(make) = filter.make.as_deref().filter(|m| !m.trim().is_empty()) {
            let pattern = format!("%{}%", escape_like(make.trim()));
            builder.push(" AND v.make ILIKE ").push_bind(pattern);
        }
        if let Some(min) = filter.min_price_cents {
            builder.push(" AND v.price_cents >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price_cents {
            builder.push(" AND v.price_cents <= ").push_bind(max);
        }
        if let Some(year) = filter.min_year {
            builder.push(" AND v.year >= ").push_bind(year);
        }
        if let Some(slug) = filter.partner_slug.as_deref() {
            builder.push(" AND p.slug = ").push_bind(slug.to_string());
        }

        builder
            .push(" ORDER BY v.created_at DESC LIMIT ")
            .push_bind(filter.page_size())
            .push(" OFFSET ")
            .push_bind(filter.page_offset());

        builder.build_query_as::<Vehicle>().fetch_all(pool).await
    }

    pub async fn inventory_summary(
        pool: &PgPool,
        partner_id: Uuid,
    ) -> Result<InventorySummary, sqlx::Error> {
        let rows: Vec<(VehicleStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM vehicles WHERE partner_id = $1 GROUP BY status",
        )
        .bind(partner_id)
        .fetch_all(pool)
        .await?;

        let mut summary = InventorySummary::default();
        for (status, count) in rows {
            summary.add(status, count);
        }
        Ok(summary)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM vehicles")
            .fetch_one(pool)
            .await
    }

    pub async fn count_published(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM vehicles WHERE status = 'published'")
            .fetch_one(pool)
            .await
    }
}

fn prefixed_columns(alias: &str) -> String {
    VEHICLE_COLUMNS
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escapes LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_paging() {
        let filter = VehicleFilter::default();
        assert_eq!(filter.page_size(), 20);
        assert_eq!(filter.page_offset(), 0);

        let filter = VehicleFilter {
            limit: Some(10_000),
            offset: Some(-5),
            ..Default::default()
        };
        assert_eq!(filter.page_size(), MAX_PAGE_SIZE);
        assert_eq!(filter.page_offset(), 0);

        let filter = VehicleFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(filter.page_size(), 1);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(VehicleStatus::parse("Published"), Some(VehicleStatus::Published));
        assert_eq!(VehicleStatus::parse(" sold "), Some(VehicleStatus::Sold));
        assert_eq!(VehicleStatus::parse("leased"), None);
        assert_eq!(VehicleStatus::Archived.as_str(), "archived");
    }

    #[test]
    fn test_prefixed_columns() {
        let cols = prefixed_columns("v");
        assert!(cols.starts_with("v.id, v.partner_id, v.make"));
        assert!(cols.ends_with("v.updated_at"));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("land cruiser"), "land cruiser");
        assert_eq!(escape_like("100%_x\\"), "100\\%\\_x\\\\");
    }

    #[test]
    fn test_inventory_summary_total() {
        let mut summary = InventorySummary::default();
        summary.add(VehicleStatus::Published, 3);
        summary.add(VehicleStatus::Sold, 2);
        summary.add(VehicleStatus::Draft, 1);
        assert_eq!(summary.published, 3);
        assert_eq!(summary.total(), 6);
    }

    #[test]
    fn test_vehicle_status_serde() {
        let status: VehicleStatus = serde_json::from_str("\"published\"").unwrap();
        assert_eq!(status, VehicleStatus::Published);
        assert_eq!(VehicleStatus::Archived.as_str(), "archived");
    }
}
