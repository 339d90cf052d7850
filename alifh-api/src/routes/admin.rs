/// Platform administration endpoints
///
/// Every handler takes [`PlatformAdmin`], so callers without
/// `isAlifhAdmin` get 403 (401 when signed out).
///
/// # Endpoints
///
/// - `GET   /api/admin/users?limit&offset`
/// - `PATCH /api/admin/users/:id/role` `{ "role": "admin" }`
/// - `GET   /api/admin/partners?limit&offset`
/// - `POST  /api/admin/partners`
/// - `PATCH /api/admin/partners/:id/status` `{ "status": "active" }`
/// - `POST  /api/admin/partners/:id/members` `{ "email": "...", "role": "owner" }`

use super::{partners::guarded_result, Pagination};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::PlatformAdmin,
};
use alifh_shared::models::{
    membership::{MembershipChange, PartnerMembership, PartnerRole},
    partner::{is_valid_slug, CreatePartner, Partner, PartnerStatus},
    user::{User, UserRole},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct PartnerList {
    pub partners: Vec<Partner>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePartnerRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub slug: Option<String>,

    pub status: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub contact_email: Option<String>,

    #[validate(length(max = 64, message = "Phone must be at most 64 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 255, message = "City must be at most 255 characters"))]
    pub city: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Defaults to `staff`
    pub role: Option<String>,
}

pub(crate) fn parse_partner_role(raw: Option<&str>) -> ApiResult<PartnerRole> {
    match raw {
        None => Ok(PartnerRole::Staff),
        Some(raw) => PartnerRole::parse(raw)
            .ok_or_else(|| ApiError::invalid_field("role", "Role must be owner, admin or staff")),
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: PlatformAdmin,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<UserList>> {
    let users = User::list(&state.db, page.limit(), page.offset()).await?;
    let total = User::count(&state.db).await?;

    Ok(Json(UserList { users, total }))
}

pub async fn update_user_role(
    State(state): State<AppState>,
    PlatformAdmin(admin): PlatformAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<RoleRequest>,
) -> ApiResult<Json<User>> {
    let role = UserRole::parse(&req.role)
        .ok_or_else(|| ApiError::invalid_field("role", "Role must be user or admin"))?;

    if id == admin.user.id && role != UserRole::Admin && admin.user.is_platform_admin() {
        return Err(ApiError::Conflict(
            "Administrators cannot remove their own admin role".to_string(),
        ));
    }

    let user = User::set_role(&state.db, id, role)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!(actor = %admin.user.id, user_id = %user.id, role = role.as_str(), "Platform role changed");

    Ok(Json(user))
}

pub async fn list_partners(
    State(state): State<AppState>,
    _admin: PlatformAdmin,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<PartnerList>> {
    let partners = Partner::list(&state.db, page.limit(), page.offset()).await?;
    let total = Partner::count(&state.db).await?;

    Ok(Json(PartnerList { partners, total }))
}

pub async fn create_partner(
    State(state): State<AppState>,
    PlatformAdmin(admin): PlatformAdmin,
    Json(req): Json<CreatePartnerRequest>,
) -> ApiResult<(StatusCode, Json<Partner>)> {
    req.validate()?;

    if let Some(slug) = &req.slug {
        if !is_valid_slug(slug) {
            return Err(ApiError::invalid_field(
                "slug",
                "Slug must be 2-64 lower-case letters, digits and single dashes",
            ));
        }
    } else if !is_valid_slug(&alifh_shared::models::partner::slugify(&req.name)) {
        return Err(ApiError::invalid_field(
            "name",
            "Name must contain at least two letters or digits, or pass an explicit slug",
        ));
    }

    let status = match req.status.as_deref() {
        None => PartnerStatus::Pending,
        Some(raw) => PartnerStatus::parse(raw).ok_or_else(|| {
            ApiError::invalid_field("status", "Status must be pending, active or suspended")
        })?,
    };

    let partner = Partner::create(
        &state.db,
        CreatePartner {
            name: req.name.trim().to_string(),
            slug: req.slug,
            status,
            contact_email: req.contact_email,
            phone: req.phone,
            city: req.city,
        },
    )
    .await?;

    info!(actor = %admin.user.id, partner_id = %partner.id, slug = %partner.slug, "Partner created");

    Ok((StatusCode::CREATED, Json(partner)))
}

pub async fn update_partner_status(
    State(state): State<AppState>,
    PlatformAdmin(admin): PlatformAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<Partner>> {
    let status = PartnerStatus::parse(&req.status).ok_or_else(|| {
        ApiError::invalid_field("status", "Status must be pending, active or suspended")
    })?;

    let partner = Partner::set_status(&state.db, id, status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Partner not found".to_string()))?;

    info!(actor = %admin.user.id, partner_id = %partner.id, status = status.as_str(), "Partner status changed");

    Ok(Json(partner))
}

/// Adds (or reactivates) a user in a partner with any role
///
/// Demoting the partner's only active owner is refused with 409.
pub async fn add_partner_member(
    State(state): State<AppState>,
    PlatformAdmin(admin): PlatformAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<PartnerMembership>)> {
    req.validate()?;
    let role = parse_partner_role(req.role.as_deref())?;

    let partner = Partner::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Partner not found".to_string()))?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No user with that email".to_string()))?;

    let outcome = PartnerMembership::apply_guarded(
        &state.db,
        partner.id,
        user.id,
        MembershipChange::Assign(role),
    )
    .await?;
    let membership = guarded_result(outcome)?
        .ok_or_else(|| ApiError::NotFound("Membership not found".to_string()))?;

    info!(
        actor = %admin.user.id,
        partner_id = %partner.id,
        user_id = %user.id,
        role = role.as_str(),
        "Partner member assigned"
    );

    Ok((StatusCode::CREATED, Json(membership)))
}
