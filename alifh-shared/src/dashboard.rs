//! Role-segmented dashboards
//!
//! Every signed-in user lands on exactly one dashboard:
//!
//! | Who                                        | Route            |
//! |--------------------------------------------|------------------|
//! | Platform admin                             | `/admin`         |
//! | Partner owner                              | `/partner/owner` |
//! | Partner admin                              | `/partner/admin` |
//! | Partner staff                              | `/partner/staff` |
//! | Everyone else                              | `/account`       |
//!
//! Requests for a dashboard the user may not see are redirected to the one
//! they resolve to.

use serde::{Deserialize, Serialize};

use crate::models::membership::{MembershipWithPartner, PartnerRole};
use crate::models::user::User;

/// Where unauthenticated visitors are sent
pub const SIGN_IN_PATH: &str = "/sign-in";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardRoute {
    Admin,
    PartnerOwner,
    PartnerAdmin,
    PartnerStaff,
    Account,
}

impl DashboardRoute {
    pub fn path(&self) -> &'static str {
        match self {
            DashboardRoute::Admin => "/admin",
            DashboardRoute::PartnerOwner => "/partner/owner",
            DashboardRoute::PartnerAdmin => "/partner/admin",
            DashboardRoute::PartnerStaff => "/partner/staff",
            DashboardRoute::Account => "/account",
        }
    }

    pub fn for_partner_role(role: PartnerRole) -> Self {
        match role {
            PartnerRole::Owner => DashboardRoute::PartnerOwner,
            PartnerRole::Admin => DashboardRoute::PartnerAdmin,
            PartnerRole::Staff => DashboardRoute::PartnerStaff,
        }
    }

    /// Maps a raw partner role string. Unrecognised roles get the staff
    /// dashboard, the least privileged of the three.
    pub fn for_role_str(role: &str) -> Self {
        PartnerRole::parse(role)
            .map(Self::for_partner_role)
            .unwrap_or(DashboardRoute::PartnerStaff)
    }

    /// Partner role a partner dashboard is meant for
    pub fn partner_role(&self) -> Option<PartnerRole> {
        match self {
            DashboardRoute::PartnerOwner => Some(PartnerRole::Owner),
            DashboardRoute::PartnerAdmin => Some(PartnerRole::Admin),
            DashboardRoute::PartnerStaff => Some(PartnerRole::Staff),
            _ => None,
        }
    }
}

/// Display-oriented access flags derived from the user row and their
/// active partner-staff rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSummary {
    pub has_partner_access: bool,
    pub is_alifh_admin: bool,
}

impl AccessSummary {
    /// - `has_partner_access`: at least one active membership in a
    ///   non-suspended partner
    /// - `is_alifh_admin`: platform role `admin`, or an active owner/admin
    ///   membership in the platform partner
    pub fn from_memberships(
        user: &User,
        memberships: &[MembershipWithPartner],
        platform_partner_slug: &str,
    ) -> Self {
        let mut active = memberships.iter().filter(|m| m.grants_access());

        let has_partner_access = active.clone().next().is_some();
        let platform_staff_admin = active.any(|m| {
            m.partner_slug == platform_partner_slug && m.role.has_permission(&PartnerRole::Admin)
        });

        Self {
            has_partner_access,
            is_alifh_admin: user.is_platform_admin() || platform_staff_admin,
        }
    }
}

/// Highest-ranked active membership; ties go to the oldest row
pub fn primary_membership(memberships: &[MembershipWithPartner]) -> Option<&MembershipWithPartner> {
    memberships
        .iter()
        .filter(|m| m.grants_access())
        .fold(None, |best: Option<&MembershipWithPartner>, m| match best {
            Some(b) if !outranks(m, b) => Some(b),
            _ => Some(m),
        })
}

fn outranks(a: &MembershipWithPartner, b: &MembershipWithPartner) -> bool {
    if a.role == b.role {
        a.created_at < b.created_at
    } else {
        a.role.has_permission(&b.role)
    }
}

/// Active membership for a given partner slug, or the primary one
pub fn select_membership<'a>(
    memberships: &'a [MembershipWithPartner],
    partner_slug: Option<&str>,
) -> Option<&'a MembershipWithPartner> {
    match partner_slug {
        Some(slug) => memberships
            .iter()
            .find(|m| m.partner_slug == slug && m.grants_access()),
        None => primary_membership(memberships),
    }
}

/// The dashboard a user lands on
pub fn resolve(access: &AccessSummary, memberships: &[MembershipWithPartner]) -> DashboardRoute {
    if access.is_alifh_admin {
        return DashboardRoute::Admin;
    }

    primary_membership(memberships)
        .map(|m| DashboardRoute::for_partner_role(m.role))
        .unwrap_or(DashboardRoute::Account)
}

/// Outcome of a role gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(DashboardRoute),
}

/// Decides whether `requested` may be shown.
///
/// - `/account` is open to every signed-in user
/// - `/admin` requires `is_alifh_admin`
/// - partner dashboards require an active membership whose role maps to that
///   dashboard, in the partner picked by `partner_slug` (or the primary one)
/// - platform admins may open any dashboard
pub fn gate(
    access: &AccessSummary,
    memberships: &[MembershipWithPartner],
    requested: DashboardRoute,
    partner_slug: Option<&str>,
) -> GateDecision {
    if access.is_alifh_admin {
        return GateDecision::Allow;
    }

    let allowed = match requested {
        DashboardRoute::Account => true,
        DashboardRoute::Admin => false,
        partner_route => select_membership(memberships, partner_slug)
            .map(|m| DashboardRoute::for_partner_role(m.role) == partner_route)
            .unwrap_or(false),
    };

    if allowed {
        GateDecision::Allow
    } else {
        GateDecision::Redirect(resolve(access, memberships))
    }
}

/// Sign-in URL that returns to `path` afterwards
pub fn sign_in_redirect(path: &str) -> String {
    let mut url = String::from(SIGN_IN_PATH);
    url.push_str("?callbackURL=");
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                url.push(byte as char)
            }
            _ => url.push_str(&format!("%{:02X}", byte)),
        }
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::partner::PartnerStatus;
    use crate::models::user::UserRole;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            email_verified: true,
            password_hash: None,
            name: None,
            image: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    fn membership(slug: &str, role: PartnerRole, age_days: i64) -> MembershipWithPartner {
        MembershipWithPartner {
            membership_id: Uuid::new_v4(),
            partner_id: Uuid::new_v4(),
            partner_name: slug.to_string(),
            partner_slug: slug.to_string(),
            partner_status: PartnerStatus::Active,
            role,
            is_active: true,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    fn access(user: &User, rows: &[MembershipWithPartner]) -> AccessSummary {
        AccessSummary::from_memberships(user, rows, "alifh")
    }

    #[test]
    fn test_role_string_mapping() {
        assert_eq!(DashboardRoute::for_role_str("owner").path(), "/partner/owner");
        assert_eq!(DashboardRoute::for_role_str("Admin").path(), "/partner/admin");
        assert_eq!(DashboardRoute::for_role_str("staff").path(), "/partner/staff");
        assert_eq!(DashboardRoute::for_role_str("janitor"), DashboardRoute::PartnerStaff);
    }

    #[test]
    fn test_access_summary_end_user() {
        let u = user(UserRole::User);
        let summary = access(&u, &[]);
        assert!(!summary.has_partner_access);
        assert!(!summary.is_alifh_admin);
    }

    #[test]
    fn test_access_summary_ignores_inactive_and_suspended() {
        let u = user(UserRole::User);
        let mut inactive = membership("desert-motors", PartnerRole::Owner, 3);
        inactive.is_active = false;
        let mut suspended = membership("gulf-autos", PartnerRole::Staff, 2);
        suspended.partner_status = PartnerStatus::Suspended;

        let summary = access(&u, &[inactive, suspended]);
        assert!(!summary.has_partner_access);
    }

    #[test]
    fn test_access_summary_platform_partner_admin() {
        let u = user(UserRole::User);
        let rows = [membership("alifh", PartnerRole::Admin, 1)];
        let summary = access(&u, &rows);
        assert!(summary.has_partner_access);
        assert!(summary.is_alifh_admin);

        let staff_only = [membership("alifh", PartnerRole::Staff, 1)];
        assert!(!access(&u, &staff_only).is_alifh_admin);
    }

    #[test]
    fn test_access_summary_platform_role() {
        let u = user(UserRole::Admin);
        let summary = access(&u, &[]);
        assert!(summary.is_alifh_admin);
        assert!(!summary.has_partner_access);
    }

    #[test]
    fn test_resolve() {
        let end_user = user(UserRole::User);
        assert_eq!(resolve(&access(&end_user, &[]), &[]), DashboardRoute::Account);

        let rows = [
            membership("desert-motors", PartnerRole::Staff, 10),
            membership("gulf-autos", PartnerRole::Owner, 1),
        ];
        assert_eq!(resolve(&access(&end_user, &rows), &rows), DashboardRoute::PartnerOwner);

        let admin = user(UserRole::Admin);
        assert_eq!(resolve(&access(&admin, &rows), &rows), DashboardRoute::Admin);
    }

    #[test]
    fn test_primary_membership_tie_breaks_on_age() {
        let rows = [
            membership("newer", PartnerRole::Admin, 1),
            membership("older", PartnerRole::Admin, 30),
            membership("staff", PartnerRole::Staff, 90),
        ];
        assert_eq!(primary_membership(&rows).unwrap().partner_slug, "older");
    }

    #[test]
    fn test_gate_partner_dashboards() {
        let u = user(UserRole::User);
        let rows = [membership("desert-motors", PartnerRole::Admin, 5)];
        let summary = access(&u, &rows);

        assert_eq!(gate(&summary, &rows, DashboardRoute::PartnerAdmin, None), GateDecision::Allow);
        assert_eq!(
            gate(&summary, &rows, DashboardRoute::PartnerOwner, None),
            GateDecision::Redirect(DashboardRoute::PartnerAdmin)
        );
        assert_eq!(
            gate(&summary, &rows, DashboardRoute::Admin, None),
            GateDecision::Redirect(DashboardRoute::PartnerAdmin)
        );
        assert_eq!(gate(&summary, &rows, DashboardRoute::Account, None), GateDecision::Allow);
    }

    #[test]
    fn test_gate_with_partner_selection() {
        let u = user(UserRole::User);
        let rows = [
            membership("desert-motors", PartnerRole::Owner, 5),
            membership("gulf-autos", PartnerRole::Staff, 2),
        ];
        let summary = access(&u, &rows);

        assert_eq!(
            gate(&summary, &rows, DashboardRoute::PartnerStaff, Some("gulf-autos")),
            GateDecision::Allow
        );
        assert_eq!(
            gate(&summary, &rows, DashboardRoute::PartnerStaff, None),
            GateDecision::Redirect(DashboardRoute::PartnerOwner)
        );
        assert_eq!(
            gate(&summary, &rows, DashboardRoute::PartnerOwner, Some("unknown")),
            GateDecision::Redirect(DashboardRoute::PartnerOwner)
        );
    }

    #[test]
    fn test_gate_end_user_redirected_to_account() {
        let u = user(UserRole::User);
        let summary = access(&u, &[]);
        assert_eq!(
            gate(&summary, &[], DashboardRoute::PartnerStaff, None),
            GateDecision::Redirect(DashboardRoute::Account)
        );
    }

    #[test]
    fn test_gate_platform_admin_sees_everything() {
        let u = user(UserRole::Admin);
        let summary = access(&u, &[]);
        for route in [
            DashboardRoute::Admin,
            DashboardRoute::PartnerOwner,
            DashboardRoute::PartnerStaff,
            DashboardRoute::Account,
        ] {
            assert_eq!(gate(&summary, &[], route, None), GateDecision::Allow);
        }
    }

    #[test]
    fn test_sign_in_redirect() {
        assert_eq!(sign_in_redirect("/dashboard"), "/sign-in?callbackURL=/dashboard");
        assert_eq!(
            sign_in_redirect("/partner/staff?partner=a b"),
            "/sign-in?callbackURL=/partner/staff%3Fpartner%3Da%20b"
        );
    }
}
