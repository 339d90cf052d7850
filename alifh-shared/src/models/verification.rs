/// Magic-link verification records
///
/// One row per issued magic link. The row id doubles as the `jti` claim of
/// the signed link token, so a link can be redeemed at most once even though
/// the token itself stays cryptographically valid until `exp`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE verifications (
///     id UUID PRIMARY KEY,
///     identifier VARCHAR(255) NOT NULL,
///     name VARCHAR(255),
///     callback_url TEXT,
///     expires_at TIMESTAMPTZ NOT NULL,
///     consumed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Verification {
    pub id: Uuid,

    /// Normalized email the link was sent to
    pub identifier: String,

    /// Display name supplied when requesting the link (used on sign-up)
    pub name: Option<String>,

    pub callback_url: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateVerification {
    pub id: Uuid,
    pub identifier: String,
    pub name: Option<String>,
    pub callback_url: Option<String>,
    pub expires_at: DateTime<Utc>,
}

const VERIFICATION_COLUMNS: &str =
    "id, identifier, name, callback_url, expires_at, consumed_at, created_at";

impl Verification {
    pub async fn create(pool: &PgPool, data: CreateVerification) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO verifications (id, identifier, name, callback_url, expires_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {VERIFICATION_COLUMNS}"
        );

        sqlx::query_as::<_, Verification>(&sql)
            .bind(data.id)
            .bind(data.identifier)
            .bind(data.name)
            .bind(data.callback_url)
            .bind(data.expires_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {VERIFICATION_COLUMNS} FROM verifications WHERE id = $1");

        sqlx::query_as::<_, Verification>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Marks the record consumed. Returns None when it does not exist, has
    /// expired or was already consumed. At most one caller ever gets Some.
    pub async fn consume(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE verifications SET consumed_at = NOW() \
             WHERE id = $1 AND consumed_at IS NULL AND expires_at > NOW() \
             RETURNING {VERIFICATION_COLUMNS}"
        );

        sqlx::query_as::<_, Verification>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM verifications WHERE expires_at <= NOW() OR consumed_at IS NOT NULL",
        )
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
