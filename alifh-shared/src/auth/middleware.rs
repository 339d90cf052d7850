/// Session resolution
///
/// Turns the token presented by a request into an [`AuthSession`]: the
/// session row, its user, the user's partner memberships and the derived
/// [`AccessSummary`]. The HTTP layer calls [`resolve_session`] once per
/// request and stores the result in request extensions.
///
/// A missing, malformed, unknown or expired token resolves to `Ok(None)`.
/// Only database failures are errors.
///
/// # Example
///
/// ```no_run
/// use alifh_shared::auth::middleware::{resolve_session, SessionSettings};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, token: &str) -> Result<(), sqlx::Error> {
/// let settings = SessionSettings::default();
/// if let Some(auth) = resolve_session(&pool, token, &settings).await? {
///     println!("{} has partner access: {}", auth.user.email, auth.access.has_partner_access);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, warn};

use super::session_token::{generate_session_token, hash_session_token, is_valid_format};
use crate::dashboard::{self, AccessSummary, DashboardRoute};
use crate::models::membership::{MembershipWithPartner, PartnerMembership};
use crate::models::session::{CreateSession, Session};
use crate::models::user::User;

/// Session lifetime and platform settings used during resolution
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Lifetime of a new or refreshed session
    pub ttl: Duration,

    /// Sessions untouched for longer than this are extended on use
    pub refresh_after: Duration,

    /// Slug of the partner whose owners/admins are platform admins
    pub platform_partner_slug: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::days(7),
            refresh_after: Duration::days(1),
            platform_partner_slug: "alifh".to_string(),
        }
    }
}

/// Everything known about the signed-in user for one request
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub session: Session,
    pub user: User,
    pub memberships: Vec<MembershipWithPartner>,
    pub access: AccessSummary,
}

impl AuthSession {
    /// Dashboard this user lands on
    pub fn dashboard(&self) -> DashboardRoute {
        dashboard::resolve(&self.access, &self.memberships)
    }

    /// Active membership in the partner with `slug`
    pub fn membership_for(&self, slug: &str) -> Option<&MembershipWithPartner> {
        self.memberships
            .iter()
            .find(|m| m.partner_slug == slug && m.grants_access())
    }
}

/// Plaintext token and the row it created
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

/// Creates a session for `user_id` and records the login
pub async fn issue_session(
    pool: &PgPool,
    user_id: uuid::Uuid,
    settings: &SessionSettings,
    ip_address: Option<String>,
    user_agent: Option<String>,
) -> Result<IssuedSession, sqlx::Error> {
    let (token, token_hash) = generate_session_token();

    let session = Session::create(
        pool,
        CreateSession {
            token_hash,
            user_id,
            expires_at: Utc::now() + settings.ttl,
            ip_address,
            user_agent,
        },
    )
    .await?;

    User::update_last_login(pool, user_id).await?;

    debug!(user_id = %user_id, session_id = %session.id, "Session issued");

    Ok(IssuedSession { token, session })
}

/// Resolves a presented token into an [`AuthSession`]
pub async fn resolve_session(
    pool: &PgPool,
    token: &str,
    settings: &SessionSettings,
) -> Result<Option<AuthSession>, sqlx::Error> {
    if !is_valid_format(token) {
        return Ok(None);
    }

    let token_hash = hash_session_token(token);
    let Some(mut session) = Session::find_valid_by_token_hash(pool, &token_hash).await? else {
        return Ok(None);
    };

    let now = Utc::now();
    if session.needs_refresh_at(now, settings.refresh_after) {
        if let Some(extended) = Session::extend(pool, session.id, now + settings.ttl).await? {
            debug!(session_id = %extended.id, expires_at = %extended.expires_at, "Session extended");
            session = extended;
        }
    }

    let Some(user) = User::find_by_id(pool, session.user_id).await? else {
        // Sessions cascade with their user, so this only races a delete
        warn!(session_id = %session.id, "Session refers to a missing user");
        return Ok(None);
    };

    let memberships = PartnerMembership::list_for_user_with_partner(pool, user.id).await?;
    let access =
        AccessSummary::from_memberships(&user, &memberships, &settings.platform_partner_slug);

    Ok(Some(AuthSession {
        session,
        user,
        memberships,
        access,
    }))
}

/// Deletes the session behind `token`. Unknown tokens are not an error.
pub async fn revoke_session(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
    if !is_valid_format(token) {
        return Ok(false);
    }

    Session::delete_by_token_hash(pool, &hash_session_token(token)).await
}
