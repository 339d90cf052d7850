/// Role-gated dashboards
///
/// | Route            | Who may view it                                 |
/// |------------------|-------------------------------------------------|
/// | `/admin`         | platform admins                                 |
/// | `/partner/owner` | partner owners (platform admins too)            |
/// | `/partner/admin` | partner admins (platform admins too)            |
/// | `/partner/staff` | partner staff (platform admins too)             |
/// | `/account`       | every signed-in user                            |
///
/// Signed-out visitors are redirected (303) to `/sign-in?callbackURL=...`.
/// Signed-in users asking for a dashboard that is not theirs are redirected
/// to the one they resolve to. `GET /dashboard` always redirects.
///
/// Partner dashboards take `?partner=<slug>` to choose among memberships.

use crate::{app::AppState, error::ApiResult, middleware::session::MaybeAuth};
use alifh_shared::{
    auth::middleware::AuthSession,
    dashboard::{gate, select_membership, sign_in_redirect, DashboardRoute, GateDecision},
    models::{
        membership::{MembershipWithPartner, PartnerMembership, PartnerRole},
        partner::{Partner, PartnerStatus},
        user::User,
        vehicle::{InventorySummary, Vehicle},
    },
};
use axum::{
    extract::{OriginalUri, Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Listings shown on a partner dashboard
const RECENT_VEHICLES: i64 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub partner: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlatformStats {
    pub users: i64,
    pub partners: i64,
    pub pending_partners: i64,
    pub active_partners: i64,
    pub suspended_partners: i64,
    pub vehicles: i64,
    pub published_vehicles: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub dashboard: &'static str,
    pub user: User,
    pub stats: PlatformStats,
}

#[derive(Debug, Serialize)]
pub struct PartnerDashboard {
    pub dashboard: &'static str,
    pub user: User,
    pub partner: Partner,
    pub role: PartnerRole,
    pub active_members: i64,
    pub inventory: InventorySummary,
    pub recent_vehicles: Vec<Vehicle>,
}

#[derive(Debug, Serialize)]
pub struct AccountDashboard {
    pub dashboard: &'static str,
    pub user: User,
    pub memberships: Vec<MembershipWithPartner>,
    pub has_partner_access: bool,
    pub is_alifh_admin: bool,
}

/// Applies the role gate; `Err` carries the redirect to send instead
fn admit(
    auth: Option<AuthSession>,
    uri: &OriginalUri,
    route: DashboardRoute,
    partner_slug: Option<&str>,
) -> Result<AuthSession, Response> {
    let Some(auth) = auth else {
        let path = uri
            .0
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(route.path());
        return Err(Redirect::to(&sign_in_redirect(path)).into_response());
    };

    match gate(&auth.access, &auth.memberships, route, partner_slug) {
        GateDecision::Allow => Ok(auth),
        GateDecision::Redirect(target) => {
            tracing::debug!(
                user_id = %auth.user.id,
                requested = route.path(),
                target = target.path(),
                "Role gate redirect"
            );
            Err(Redirect::to(target.path()).into_response())
        }
    }
}

/// `GET /dashboard`
pub async fn dashboard_redirect(MaybeAuth(auth): MaybeAuth) -> Redirect {
    match auth {
        Some(auth) => Redirect::to(auth.dashboard().path()),
        None => Redirect::to(&sign_in_redirect("/dashboard")),
    }
}

/// `GET /admin`
pub async fn admin_dashboard(
    State(state): State<AppState>,
    MaybeAuth(auth): MaybeAuth,
    uri: OriginalUri,
) -> ApiResult<Response> {
    let auth = match admit(auth, &uri, DashboardRoute::Admin, None) {
        Ok(auth) => auth,
        Err(redirect) => return Ok(redirect),
    };

    let stats = PlatformStats {
        users: User::count(&state.db).await?,
        partners: Partner::count(&state.db).await?,
        pending_partners: Partner::count_by_status(&state.db, PartnerStatus::Pending).await?,
        active_partners: Partner::count_by_status(&state.db, PartnerStatus::Active).await?,
        suspended_partners: Partner::count_by_status(&state.db, PartnerStatus::Suspended).await?,
        vehicles: Vehicle::count(&state.db).await?,
        published_vehicles: Vehicle::count_published(&state.db).await?,
    };

    Ok(Json(AdminDashboard {
        dashboard: DashboardRoute::Admin.path(),
        user: auth.user,
        stats,
    })
    .into_response())
}

/// `GET /partner/owner`
pub async fn partner_owner_dashboard(
    state: State<AppState>,
    auth: MaybeAuth,
    uri: OriginalUri,
    query: Query<DashboardQuery>,
) -> ApiResult<Response> {
    partner_dashboard(state, auth, uri, query, DashboardRoute::PartnerOwner).await
}

/// `GET /partner/admin`
pub async fn partner_admin_dashboard(
    state: State<AppState>,
    auth: MaybeAuth,
    uri: OriginalUri,
    query: Query<DashboardQuery>,
) -> ApiResult<Response> {
    partner_dashboard(state, auth, uri, query, DashboardRoute::PartnerAdmin).await
}

/// `GET /partner/staff`
pub async fn partner_staff_dashboard(
    state: State<AppState>,
    auth: MaybeAuth,
    uri: OriginalUri,
    query: Query<DashboardQuery>,
) -> ApiResult<Response> {
    partner_dashboard(state, auth, uri, query, DashboardRoute::PartnerStaff).await
}

async fn partner_dashboard(
    State(state): State<AppState>,
    MaybeAuth(auth): MaybeAuth,
    uri: OriginalUri,
    Query(query): Query<DashboardQuery>,
    route: DashboardRoute,
) -> ApiResult<Response> {
    let slug = query.partner.as_deref().filter(|s| !s.is_empty());
    let auth = match admit(auth, &uri, route, slug) {
        Ok(auth) => auth,
        Err(redirect) => return Ok(redirect),
    };

    let membership = select_membership(&auth.memberships, slug);
    let partner = match (slug, membership) {
        (_, Some(m)) => Partner::find_by_id(&state.db, m.partner_id).await?,
        (Some(slug), None) => Partner::find_by_slug(&state.db, slug).await?,
        // Platform admin without a membership and no partner chosen
        (None, None) => return Ok(Redirect::to(DashboardRoute::Admin.path()).into_response()),
    };

    let Some(partner) = partner else {
        return Err(crate::error::ApiError::NotFound("Partner not found".to_string()));
    };

    let role = membership
        .map(|m| m.role)
        .or_else(|| route.partner_role())
        .unwrap_or(PartnerRole::Staff);

    let active_members = PartnerMembership::count_by_partner(&state.db, partner.id).await?;
    let inventory = Vehicle::inventory_summary(&state.db, partner.id).await?;
    let recent_vehicles = Vehicle::list_by_partner(&state.db, partner.id, RECENT_VEHICLES, 0).await?;

    Ok(Json(PartnerDashboard {
        dashboard: route.path(),
        user: auth.user,
        partner,
        role,
        active_members,
        inventory,
        recent_vehicles,
    })
    .into_response())
}

/// `GET /account`
pub async fn account_dashboard(
    MaybeAuth(auth): MaybeAuth,
    uri: OriginalUri,
) -> ApiResult<Response> {
    let auth = match admit(auth, &uri, DashboardRoute::Account, None) {
        Ok(auth) => auth,
        Err(redirect) => return Ok(redirect),
    };

    Ok(Json(AccountDashboard {
        dashboard: DashboardRoute::Account.path(),
        has_partner_access: auth.access.has_partner_access,
        is_alifh_admin: auth.access.is_alifh_admin,
        user: auth.user,
        memberships: auth.memberships,
    })
    .into_response())
}
