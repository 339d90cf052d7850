/// Session-extension endpoint
///
/// ```text
/// GET /api/auth/session
/// ```
///
/// ```json
/// {
///   "session": { ... },
///   "user": { ... },
///   "partnerMemberships": [ ... ],
///   "hasPartnerAccess": true,
///   "isAlifhAdmin": false,
///   "dashboard": "/partner/staff"
/// }
/// ```
///
/// Without a valid session the response is 401 JSON. A database failure
/// while resolving the session is logged and answered with 500 JSON.

use crate::middleware::session::AuthUser;
use alifh_shared::models::{
    membership::MembershipWithPartner, session::Session, user::User,
};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExtensionResponse {
    pub session: Session,
    pub user: User,
    pub partner_memberships: Vec<MembershipWithPartner>,
    pub has_partner_access: bool,
    pub is_alifh_admin: bool,
    pub dashboard: String,
}

pub async fn session_extension(AuthUser(auth): AuthUser) -> Json<SessionExtensionResponse> {
    let dashboard = auth.dashboard().path().to_string();

    Json(SessionExtensionResponse {
        has_partner_access: auth.access.has_partner_access,
        is_alifh_admin: auth.access.is_alifh_admin,
        dashboard,
        session: auth.session,
        user: auth.user,
        partner_memberships: auth.memberships,
    })
}
