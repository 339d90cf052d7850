/// Authorization helpers and permission checks
///
/// # Permission Model
///
/// 1. **Platform admin**: `users.role = admin`, or owner/admin of the platform
///    partner (see [`AccessSummary`]). May do anything.
/// 2. **Partner membership**: an active row in `partner_memberships`.
///    Inactive rows grant nothing.
/// 3. **Partner role**: owner > admin > staff
///
/// # Example
///
/// ```no_run
/// use alifh_shared::auth::authorization::require_partner_role;
/// use alifh_shared::models::membership::PartnerRole;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, partner_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// // Admins and owners may manage members
/// let role = require_partner_role(&pool, partner_id, user_id, PartnerRole::Admin).await?;
/// assert!(role.can_manage_members());
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::dashboard::AccessSummary;
use crate::models::membership::{PartnerMembership, PartnerRole};

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Not a member of partner {0}")]
    NotMember(Uuid),

    #[error("Insufficient permissions: requires {required:?}, has {actual:?}")]
    InsufficientRole {
        required: PartnerRole,
        actual: PartnerRole,
    },

    #[error("Membership in partner {0} is inactive")]
    Inactive(Uuid),

    #[error("Platform administrator access required")]
    NotPlatformAdmin,

    #[error("A {actor:?} cannot assign the {target:?} role")]
    CannotAssign {
        actor: PartnerRole,
        target: PartnerRole,
    },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub fn require_platform_admin(access: &AccessSummary) -> Result<(), AuthzError> {
    if !access.is_alifh_admin {
        return Err(AuthzError::NotPlatformAdmin);
    }

    Ok(())
}

/// Checks that `user_id` holds at least `required` in the partner and returns
/// the role actually held
pub async fn require_partner_role(
    pool: &PgPool,
    partner_id: Uuid,
    user_id: Uuid,
    required: PartnerRole,
) -> Result<PartnerRole, AuthzError> {
    let membership = PartnerMembership::find(pool, partner_id, user_id)
        .await?
        .ok_or(AuthzError::NotMember(partner_id))?;

    if !membership.is_active {
        return Err(AuthzError::Inactive(partner_id));
    }

    check_role(membership.role, required)?;
    Ok(membership.role)
}

/// Role comparison without a database round trip
pub fn check_role(actual: PartnerRole, required: PartnerRole) -> Result<(), AuthzError> {
    if !actual.has_permission(&required) {
        return Err(AuthzError::InsufficientRole { required, actual });
    }

    Ok(())
}

/// Owners may assign any role; admins may only hand out staff
pub fn can_assign_role(actor: PartnerRole, target: PartnerRole) -> bool {
    match actor {
        PartnerRole::Owner => true,
        PartnerRole::Admin => target == PartnerRole::Staff,
        PartnerRole::Staff => false,
    }
}

pub fn require_assignable(actor: PartnerRole, target: PartnerRole) -> Result<(), AuthzError> {
    if !can_assign_role(actor, target) {
        return Err(AuthzError::CannotAssign { actor, target });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_platform_admin() {
        let admin = AccessSummary {
            has_partner_access: false,
            is_alifh_admin: true,
        };
        let dealer = AccessSummary {
            has_partner_access: true,
            is_alifh_admin: false,
        };

        assert!(require_platform_admin(&admin).is_ok());
        assert!(matches!(
            require_platform_admin(&dealer),
            Err(AuthzError::NotPlatformAdmin)
        ));
    }

    #[test]
    fn test_check_role_hierarchy() {
        assert!(check_role(PartnerRole::Owner, PartnerRole::Staff).is_ok());
        assert!(check_role(PartnerRole::Admin, PartnerRole::Admin).is_ok());

        let err = check_role(PartnerRole::Staff, PartnerRole::Admin).unwrap_err();
        assert!(matches!(
            err,
            AuthzError::InsufficientRole {
                required: PartnerRole::Admin,
                actual: PartnerRole::Staff
            }
        ));
    }

    #[test]
    fn test_can_assign_role() {
        for target in [PartnerRole::Owner, PartnerRole::Admin, PartnerRole::Staff] {
            assert!(can_assign_role(PartnerRole::Owner, target));
            assert!(!can_assign_role(PartnerRole::Staff, target));
        }

        assert!(can_assign_role(PartnerRole::Admin, PartnerRole::Staff));
        assert!(!can_assign_role(PartnerRole::Admin, PartnerRole::Admin));
        assert!(!can_assign_role(PartnerRole::Admin, PartnerRole::Owner));
    }

    #[test]
    fn test_authz_error_display() {
        let id = Uuid::new_v4();
        assert!(AuthzError::NotMember(id).to_string().contains("Not a member"));
        assert!(AuthzError::Inactive(id).to_string().contains("inactive"));
        assert!(require_assignable(PartnerRole::Admin, PartnerRole::Owner)
            .unwrap_err()
            .to_string()
            .contains("cannot assign"));
    }
}
