/// Database-backed sign-in sessions
///
/// The client holds an opaque token (see `auth::session_token`); only its
/// SHA-256 hash is stored. A session is valid while `expires_at` is in the
/// future. Using a session whose `updated_at` is older than the refresh window
/// pushes `expires_at` forward (sliding expiry).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     token_hash VARCHAR(64) NOT NULL UNIQUE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     ip_address VARCHAR(64),
///     user_agent TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,

    #[serde(skip_serializing)]
    pub token_hash: String,

    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateSession {
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

const SESSION_COLUMNS: &str =
    "id, token_hash, user_id, expires_at, ip_address, user_agent, created_at, updated_at";

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// True when the session was last refreshed more than `refresh_after` ago
    pub fn needs_refresh_at(&self, now: DateTime<Utc>, refresh_after: Duration) -> bool {
        now - self.updated_at >= refresh_after
    }

    pub async fn create(pool: &PgPool, data: CreateSession) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO sessions (token_hash, user_id, expires_at, ip_address, user_agent) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SESSION_COLUMNS}"
        );

        sqlx::query_as::<_, Session>(&sql)
            .bind(data.token_hash)
            .bind(data.user_id)
            .bind(data.expires_at)
            .bind(data.ip_address)
            .bind(data.user_agent)
            .fetch_one(pool)
            .await
    }

    /// Looks a session up by token hash, ignoring expired rows
    pub async fn find_valid_by_token_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE token_hash = $1 AND expires_at > NOW()"
        );

        sqlx::query_as::<_, Session>(&sql)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Sets a new expiry and stamps `updated_at`
    pub async fn extend(
        pool: &PgPool,
        id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE sessions SET expires_at = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {SESSION_COLUMNS}"
        );

        sqlx::query_as::<_, Session>(&sql)
            .bind(id)
            .bind(expires_at)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete_by_token_hash(pool: &PgPool, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Signs a user out everywhere
    pub async fn delete_for_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_updated(ago: Duration, ttl: Duration) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            token_hash: "0".repeat(64),
            user_id: Uuid::new_v4(),
            expires_at: now - ago + ttl,
            ip_address: None,
            user_agent: None,
            created_at: now - ago,
            updated_at: now - ago,
        }
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let live = session_updated(Duration::hours(1), Duration::days(7));
        assert!(!live.is_expired_at(now));

        let dead = session_updated(Duration::days(8), Duration::days(7));
        assert!(dead.is_expired_at(now));
    }

    #[test]
    fn test_needs_refresh() {
        let now = Utc::now();
        let fresh = session_updated(Duration::hours(2), Duration::days(7));
        assert!(!fresh.needs_refresh_at(now, Duration::days(1)));

        let stale = session_updated(Duration::hours(30), Duration::days(7));
        assert!(stale.needs_refresh_at(now, Duration::days(1)));
    }

    #[test]
    fn test_token_hash_not_serialized() {
        let session = session_updated(Duration::zero(), Duration::days(7));
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("token_hash").is_none());
    }
}
