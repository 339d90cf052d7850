/// Partner memberships (partner staff rows)
///
/// Links a user to a partner with a role. Rows are deactivated rather than
/// deleted when a staff member leaves, so `is_active` is part of every access
/// decision.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE partner_role AS ENUM ('owner', 'admin', 'staff');
///
/// CREATE TABLE partner_memberships (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     partner_id UUID NOT NULL REFERENCES partners(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role partner_role NOT NULL DEFAULT 'staff',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (partner_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **owner**: full control of the partner, including other owners
/// - **admin**: manages staff and inventory
/// - **staff**: manages inventory
///
/// # Example
///
/// ```no_run
/// use alifh_shared::models::membership::{CreateMembership, PartnerMembership, PartnerRole};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, partner_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// PartnerMembership::create(&pool, CreateMembership {
///     partner_id,
///     user_id,
///     role: PartnerRole::Staff,
/// }).await?;
///
/// let role = PartnerMembership::get_active_role(&pool, partner_id, user_id).await?;
/// assert_eq!(role, Some(PartnerRole::Staff));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::partner::PartnerStatus;

/// Role of a user inside a partner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "partner_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PartnerRole {
    Owner,
    Admin,
    Staff,
}

impl PartnerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartnerRole::Owner => "owner",
            PartnerRole::Admin => "admin",
            PartnerRole::Staff => "staff",
        }
    }

    /// Parses a role string, ignoring case and surrounding whitespace
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Some(PartnerRole::Owner),
            "admin" => Some(PartnerRole::Admin),
            "staff" => Some(PartnerRole::Staff),
            _ => None,
        }
    }

    /// Hierarchy: Owner > Admin > Staff
    pub fn has_permission(&self, required: &PartnerRole) -> bool {
        self.level() >= required.level()
    }

    pub fn can_manage_members(&self) -> bool {
        self.has_permission(&PartnerRole::Admin)
    }

    pub fn can_delete_vehicles(&self) -> bool {
        self.has_permission(&PartnerRole::Admin)
    }

    fn level(&self) -> u8 {
        match self {
            PartnerRole::Owner => 3,
            PartnerRole::Admin => 2,
            PartnerRole::Staff => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PartnerMembership {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub user_id: Uuid,
    pub role: PartnerRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership joined with its partner, as used by session resolution
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MembershipWithPartner {
    pub membership_id: Uuid,
    pub partner_id: Uuid,
    pub partner_name: String,
    pub partner_slug: String,
    pub partner_status: PartnerStatus,
    pub role: PartnerRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl MembershipWithPartner {
    /// Active row in a partner that is not suspended
    pub fn grants_access(&self) -> bool {
        self.is_active && self.partner_status != PartnerStatus::Suspended
    }
}

/// Membership joined with the member's user row, for staff listings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberWithUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: PartnerRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    pub partner_id: Uuid,
    pub user_id: Uuid,

    #[serde(default = "default_role")]
    pub role: PartnerRole,
}

fn default_role() -> PartnerRole {
    PartnerRole::Staff
}

const MEMBERSHIP_COLUMNS: &str = "id, partner_id, user_id, role, is_active, created_at, updated_at";

/// Edit applied by [`PartnerMembership::apply_guarded`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// Insert, or reactivate with this role
    Assign(PartnerRole),
    Update {
        role: Option<PartnerRole>,
        is_active: Option<bool>,
    },
    Remove,
}

impl MembershipChange {
    /// Whether applying this to `current` takes an active owner away
    pub fn removes_owner(&self, current: Option<&PartnerMembership>) -> bool {
        let Some(current) = current.filter(|m| m.role == PartnerRole::Owner && m.is_active) else {
            return false;
        };

        match *self {
            MembershipChange::Assign(role) => role != PartnerRole::Owner,
            MembershipChange::Update { role, is_active } => {
                role.is_some_and(|r| r != PartnerRole::Owner) || is_active == Some(false)
            }
            MembershipChange::Remove => true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum GuardedOutcome {
    /// Row after the change; `None` once removed
    Applied(Option<PartnerMembership>),
    NotFound,
    /// Refused: the partner would have no active owner left
    LastOwner,
}

impl PartnerMembership {
    /// # Errors
    ///
    /// Fails with a unique violation (`partner_memberships_partner_user_key`)
    /// when the user already belongs to the partner.
    pub async fn create(pool: &PgPool, data: CreateMembership) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO partner_memberships (partner_id, user_id, role) \
             VALUES ($1, $2, $3) RETURNING {MEMBERSHIP_COLUMNS}"
        );

        sqlx::query_as::<_, PartnerMembership>(&sql)
            .bind(data.partner_id)
            .bind(data.user_id)
            .bind(data.role)
            .fetch_one(pool)
            .await
    }

    /// Inserts or reactivates a membership with the given role
    pub async fn upsert(pool: &PgPool, data: CreateMembership) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO partner_memberships (partner_id, user_id, role) VALUES ($1, $2, $3) \
             ON CONFLICT (partner_id, user_id) \
             DO UPDATE SET role = EXCLUDED.role, is_active = TRUE, updated_at = NOW() \
             RETURNING {MEMBERSHIP_COLUMNS}"
        );

        sqlx::query_as::<_, PartnerMembership>(&sql)
            .bind(data.partner_id)
            .bind(data.user_id)
            .bind(data.role)
            .fetch_one(pool)
            .await
    }

    pub async fn find(
        pool: &PgPool,
        partner_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM partner_memberships \
             WHERE partner_id = $1 AND user_id = $2"
        );

        sqlx::query_as::<_, PartnerMembership>(&sql)
            .bind(partner_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Role of an active membership; inactive rows yield None
    pub async fn get_active_role(
        pool: &PgPool,
        partner_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PartnerRole>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT role FROM partner_memberships
            WHERE partner_id = $1 AND user_id = $2 AND is_active = TRUE
            "#,
        )
        .bind(partner_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_role(
        pool: &PgPool,
        partner_id: Uuid,
        user_id: Uuid,
        role: PartnerRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE partner_memberships SET role = $3, updated_at = NOW() \
             WHERE partner_id = $1 AND user_id = $2 RETURNING {MEMBERSHIP_COLUMNS}"
        );

        sqlx::query_as::<_, PartnerMembership>(&sql)
            .bind(partner_id)
            .bind(user_id)
            .bind(role)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_active(
        pool: &PgPool,
        partner_id: Uuid,
        user_id: Uuid,
        is_active: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE partner_memberships SET is_active = $3, updated_at = NOW() \
             WHERE partner_id = $1 AND user_id = $2 RETURNING {MEMBERSHIP_COLUMNS}"
        );

        sqlx::query_as::<_, PartnerMembership>(&sql)
            .bind(partner_id)
            .bind(user_id)
            .bind(is_active)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, partner_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM partner_memberships WHERE partner_id = $1 AND user_id = $2")
                .bind(partner_id)
                .bind(user_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Staff of a partner with their user details, owners first
    pub async fn list_by_partner(
        pool: &PgPool,
        partner_id: Uuid,
    ) -> Result<Vec<MemberWithUser>, sqlx::Error> {
        sqlx::query_as::<_, MemberWithUser>(
            r#"
            SELECT m.user_id, u.email, u.name, m.role, m.is_active, m.created_at
            FROM partner_memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.partner_id = $1
            ORDER BY m.role ASC, m.created_at ASC
            "#,
        )
        .bind(partner_id)
        .fetch_all(pool)
        .await
    }

    /// All memberships of a user joined with partner details, oldest first
    pub async fn list_for_user_with_partner(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<MembershipWithPartner>, sqlx::Error> {
        sqlx::query_as::<_, MembershipWithPartner>(
            r#"
            SELECT m.id AS membership_id, p.id AS partner_id, p.name AS partner_name,
                   p.slug AS partner_slug, p.status AS partner_status,
                   m.role, m.is_active, m.created_at
            FROM partner_memberships m
            JOIN partners p ON p.id = m.partner_id
            WHERE m.user_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_by_partner(pool: &PgPool, partner_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM partner_memberships WHERE partner_id = $1 AND is_active = TRUE",
        )
        .bind(partner_id)
        .fetch_one(pool)
        .await
    }

    /// Active owners of a partner; guards against removing the last one
    /// Applies `change` unless it would leave the partner without an active
    /// owner
    ///
    /// The partner's active owner rows and the target row are locked
    /// `FOR UPDATE` inside one transaction, so concurrent demotions of
    /// different owners cannot both pass the check.
    pub async fn apply_guarded(
        pool: &PgPool,
        partner_id: Uuid,
        user_id: Uuid,
        change: MembershipChange,
    ) -> Result<GuardedOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let owners: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM partner_memberships
            WHERE partner_id = $1 AND role = 'owner' AND is_active = TRUE
            ORDER BY user_id
            FOR UPDATE
            "#,
        )
        .bind(partner_id)
        .fetch_all(&mut *tx)
        .await?;

        let sql = format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM partner_memberships \
             WHERE partner_id = $1 AND user_id = $2 FOR UPDATE"
        );
        let current = sqlx::query_as::<_, PartnerMembership>(&sql)
            .bind(partner_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        if current.is_none() && !matches!(change, MembershipChange::Assign(_)) {
            return Ok(GuardedOutcome::NotFound);
        }
        if change.removes_owner(current.as_ref()) && owners.len() <= 1 {
            return Ok(GuardedOutcome::LastOwner);
        }

        let row = match change {
            MembershipChange::Assign(role) => {
                let sql = format!(
                    "INSERT INTO partner_memberships (partner_id, user_id, role) VALUES ($1, $2, $3) \
                     ON CONFLICT (partner_id, user_id) \
                     DO UPDATE SET role = EXCLUDED.role, is_active = TRUE, updated_at = NOW() \
                     RETURNING {MEMBERSHIP_COLUMNS}"
                );
                let row = sqlx::query_as::<_, PartnerMembership>(&sql)
                    .bind(partner_id)
                    .bind(user_id)
                    .bind(role)
                    .fetch_one(&mut *tx)
                    .await?;
                Some(row)
            }
            MembershipChange::Update { role, is_active } => {
                let sql = format!(
                    "UPDATE partner_memberships \
                     SET role = COALESCE($3, role), is_active = COALESCE($4, is_active), updated_at = NOW() \
                     WHERE partner_id = $1 AND user_id = $2 RETURNING {MEMBERSHIP_COLUMNS}"
                );
                let row = sqlx::query_as::<_, PartnerMembership>(&sql)
                    .bind(partner_id)
                    .bind(user_id)
                    .bind(role)
                    .bind(is_active)
                    .fetch_one(&mut *tx)
                    .await?;
                Some(row)
            }
            MembershipChange::Remove => {
                sqlx::query("DELETE FROM partner_memberships WHERE partner_id = $1 AND user_id = $2")
                    .bind(partner_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                None
            }
        };

        tx.commit().await?;
        Ok(GuardedOutcome::Applied(row))
    }

    pub async fn count_active_owners(pool: &PgPool, partner_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM partner_memberships
            WHERE partner_id = $1 AND role = 'owner' AND is_active = TRUE
            "#,
        )
        .bind(partner_id)
        .fetch_one(pool)
        .await
    }
}
