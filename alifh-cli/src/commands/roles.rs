//! Role setup command
//!
//! Usage:
//!   alifh-cli setup-roles --email E --role admin
//!   alifh-cli setup-roles --email E --partner SLUG --partner-role owner

use alifh_shared::models::{
    membership::{GuardedOutcome, MembershipChange, PartnerMembership, PartnerRole},
    partner::Partner,
    user::{User, UserRole},
};
use clap::Args;

#[derive(Debug, Args)]
pub struct SetupRolesArgs {
    /// Account to change
    #[arg(long)]
    pub email: String,

    /// Platform role: user or admin
    #[arg(long)]
    pub role: Option<String>,

    /// Partner slug for a membership change
    #[arg(long, requires = "partner_role")]
    pub partner: Option<String>,

    /// Partner role: owner, admin or staff
    #[arg(long, requires = "partner")]
    pub partner_role: Option<String>,
}

/// Parsed and checked form of [`SetupRolesArgs`]
#[derive(Debug, PartialEq, Eq)]
pub struct RoleChange {
    pub platform: Option<UserRole>,
    pub membership: Option<(String, PartnerRole)>,
}

impl SetupRolesArgs {
    pub fn plan(&self) -> anyhow::Result<RoleChange> {
        let platform = self
            .role
            .as_deref()
            .map(|raw| {
                UserRole::parse(raw)
                    .ok_or_else(|| anyhow::anyhow!("Unknown platform role '{}' (user, admin)", raw))
            })
            .transpose()?;

        let membership = match (&self.partner, &self.partner_role) {
            (Some(slug), Some(raw)) => {
                let role = PartnerRole::parse(raw).ok_or_else(|| {
                    anyhow::anyhow!("Unknown partner role '{}' (owner, admin, staff)", raw)
                })?;
                Some((slug.clone(), role))
            }
            _ => None,
        };

        if platform.is_none() && membership.is_none() {
            anyhow::bail!("Nothing to do: pass --role, or --partner with --partner-role");
        }

        Ok(RoleChange {
            platform,
            membership,
        })
    }
}

pub async fn execute(database_url: &str, args: SetupRolesArgs) -> anyhow::Result<()> {
    let change = args.plan()?;
    let pool = super::connect(database_url).await?;

    let user = User::find_by_email(&pool, &args.email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No user with email {}", args.email))?;

    if let Some(role) = change.platform {
        User::set_role(&pool, user.id, role).await?;
        println!("✓ {} now has platform role {}", user.email, role.as_str());
    }

    if let Some((slug, role)) = change.membership {
        let partner = Partner::find_by_slug(&pool, &slug)
            .await?
            .ok_or_else(|| anyhow::anyhow!("No partner with slug {}", slug))?;

        let outcome = PartnerMembership::apply_guarded(
            &pool,
            partner.id,
            user.id,
            MembershipChange::Assign(role),
        )
        .await?;
        if let GuardedOutcome::LastOwner = outcome {
            anyhow::bail!(
                "{} is the only active owner of {}; make someone else owner first",
                user.email,
                partner.slug
            );
        }
        println!("✓ {} is now {} of {}", user.email, role.as_str(), partner.slug);
    }

    pool.close().await;
    Ok(())
}
