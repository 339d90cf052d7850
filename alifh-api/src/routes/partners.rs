/// Partner-scoped endpoints for members and inventory
///
/// All routes live under `/api/partners/:slug`. The caller needs an active
/// membership in that partner with at least the listed role; platform admins
/// act as owners everywhere.
///
/// | Route                        | Method | Minimum role |
/// |------------------------------|--------|--------------|
/// | `/`                          | GET    | staff        |
/// | `/`                          | PATCH  | admin        |
/// | `/members`                   | GET    | staff        |
/// | `/members`                   | POST   | admin        |
/// | `/members/:user_id`          | PATCH  | admin        |
/// | `/members/:user_id`          | DELETE | admin        |
/// | `/vehicles`                  | GET    | staff        |
/// | `/vehicles`                  | POST   | staff        |
/// | `/vehicles/:id`              | PATCH  | staff        |
/// | `/vehicles/:id`              | DELETE | admin        |
/// | `/vehicles/:id/status`       | PATCH  | staff        |
///
/// Admins may only hand out the staff role; owners may assign any role.
/// A partner always keeps at least one active owner.

use super::{
    admin::{parse_partner_role, AddMemberRequest},
    Pagination,
};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::AuthUser,
};
use alifh_shared::{
    auth::{
        authorization::{require_assignable, require_partner_role},
        middleware::AuthSession,
    },
    models::{
        membership::{
            GuardedOutcome, MemberWithUser, MembershipChange, PartnerMembership, PartnerRole,
        },
        partner::{Partner, PartnerStatus, UpdatePartner},
        user::User,
        vehicle::{CreateVehicle, InventorySummary, UpdateVehicle, Vehicle, VehicleStatus},
    },
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

const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Serialize)]
pub struct MemberList {
    pub members: Vec<MemberWithUser>,
}

#[derive(Debug, Serialize)]
pub struct VehicleList {
    pub vehicles: Vec<Vehicle>,
    pub summary: InventorySummary,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePartnerRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub contact_email: Option<String>,

    #[validate(length(max = 64, message = "Phone must be at most 64 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 255, message = "City must be at most 255 characters"))]
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VehicleStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// ISO 4217 shape: three upper-case ASCII letters
fn is_valid_currency(currency: &str) -> bool {
    currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, max = 100, message = "Make must be 1-100 characters"))]
    pub make: String,

    #[validate(length(min = 1, max = 100, message = "Model must be 1-100 characters"))]
    pub model: String,

    #[validate(range(min = 1886, max = 2100, message = "Year must be between 1886 and 2100"))]
    pub year: i32,

    #[validate(range(min = 0, message = "Price must not be negative"))]
    pub price_cents: i64,

    /// Defaults to `USD`
    pub currency: Option<String>,

    #[validate(range(min = 0, message = "Mileage must not be negative"))]
    pub mileage_km: Option<i32>,

    /// Defaults to `draft`
    pub status: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 1, max = 100, message = "Make must be 1-100 characters"))]
    pub make: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Model must be 1-100 characters"))]
    pub model: Option<String>,

    #[validate(range(min = 1886, max = 2100, message = "Year must be between 1886 and 2100"))]
    pub year: Option<i32>,

    #[validate(range(min = 0, message = "Price must not be negative"))]
    pub price_cents: Option<i64>,

    #[validate(range(min = 0, message = "Mileage must not be negative"))]
    pub mileage_km: Option<i32>,

    pub status: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
}

fn parse_vehicle_status(raw: Option<&str>) -> ApiResult<Option<VehicleStatus>> {
    raw.map(|raw| {
        VehicleStatus::parse(raw).ok_or_else(|| {
            ApiError::invalid_field("status", "Status must be draft, published, sold or archived")
        })
    })
    .transpose()
}

/// Loads the partner by slug and checks the caller's role in it
///
/// Platform admins are treated as owners. Unknown slugs are 404 for
/// everyone; a suspended partner is 403 for its own members.
async fn partner_context(
    state: &AppState,
    auth: &AuthSession,
    slug: &str,
    required: PartnerRole,
) -> ApiResult<(Partner, PartnerRole)> {
    let partner = Partner::find_by_slug(&state.db, slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Partner not found".to_string()))?;

    if auth.access.is_alifh_admin {
        return Ok((partner, PartnerRole::Owner));
    }
    if partner.status == PartnerStatus::Suspended {
        return Err(ApiError::Forbidden("Partner is suspended".to_string()));
    }

    let role = require_partner_role(&state.db, partner.id, auth.user.id, required).await?;
    Ok((partner, role))
}

/// Maps a guarded membership edit onto API errors
pub(crate) fn guarded_result(outcome: GuardedOutcome) -> ApiResult<Option<PartnerMembership>> {
    match outcome {
        GuardedOutcome::Applied(row) => Ok(row),
        GuardedOutcome::NotFound => Err(ApiError::NotFound("Membership not found".to_string())),
        GuardedOutcome::LastOwner => Err(ApiError::Conflict(
            "A partner must keep at least one active owner".to_string(),
        )),
    }
}

/// Partner profile, visible to any member
pub async fn get_partner(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<Partner>> {
    let (partner, _) = partner_context(&state, &auth, &slug, PartnerRole::Staff).await?;
    Ok(Json(partner))
}

/// Edit contact details; the slug and status are platform-admin concerns
pub async fn update_partner(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(slug): Path<String>,
    Json(req): Json<UpdatePartnerRequest>,
) -> ApiResult<Json<Partner>> {
    req.validate()?;
    let (partner, _) = partner_context(&state, &auth, &slug, PartnerRole::Admin).await?;

    let partner = Partner::update(
        &state.db,
        partner.id,
        UpdatePartner {
            name: req.name.map(|n| n.trim().to_string()),
            contact_email: req.contact_email,
            phone: req.phone,
            city: req.city,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Partner not found".to_string()))?;

    info!(actor = %auth.user.id, partner_id = %partner.id, "Partner profile updated");

    Ok(Json(partner))
}

pub async fn list_members(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<MemberList>> {
    let (partner, _) = partner_context(&state, &auth, &slug, PartnerRole::Staff).await?;
    let members = PartnerMembership::list_by_partner(&state.db, partner.id).await?;

    Ok(Json(MemberList { members }))
}

pub async fn add_member(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(slug): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<PartnerMembership>)> {
    req.validate()?;
    let role = parse_partner_role(req.role.as_deref())?;

    let (partner, actor_role) = partner_context(&state, &auth, &slug, PartnerRole::Admin).await?;
    require_assignable(actor_role, role)?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No user with that email".to_string()))?;

    if let Some(existing) = PartnerMembership::find(&state.db, partner.id, user.id).await? {
        require_assignable(actor_role, existing.role)?;
    }

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
        actor = %auth.user.id,
        partner_id = %partner.id,
        user_id = %user.id,
        role = role.as_str(),
        "Member added"
    );

    Ok((StatusCode::CREATED, Json(membership)))
}

pub async fn update_member(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path((slug, user_id)): Path<(String, Uuid)>,
    Json(req): Json<UpdateMemberRequest>,
) -> ApiResult<Json<PartnerMembership>> {
    let new_role = req.role.as_deref().map(|r| parse_partner_role(Some(r))).transpose()?;

    let (partner, actor_role) = partner_context(&state, &auth, &slug, PartnerRole::Admin).await?;

    let current = PartnerMembership::find(&state.db, partner.id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Membership not found".to_string()))?;

    require_assignable(actor_role, current.role)?;
    if let Some(role) = new_role {
        require_assignable(actor_role, role)?;
    }

    let change = MembershipChange::Update {
        role: new_role.filter(|r| *r != current.role),
        is_active: req.is_active.filter(|a| *a != current.is_active),
    };
    let membership = match change {
        MembershipChange::Update {
            role: None,
            is_active: None,
        } => current,
        change => {
            let outcome =
                PartnerMembership::apply_guarded(&state.db, partner.id, user_id, change).await?;
            guarded_result(outcome)?
                .ok_or_else(|| ApiError::NotFound("Membership not found".to_string()))?
        }
    };

    info!(
        actor = %auth.user.id,
        partner_id = %partner.id,
        user_id = %user_id,
        role = membership.role.as_str(),
        is_active = membership.is_active,
        "Member updated"
    );

    Ok(Json(membership))
}

pub async fn remove_member(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path((slug, user_id)): Path<(String, Uuid)>,
) -> ApiResult<StatusCode> {
    let (partner, actor_role) = partner_context(&state, &auth, &slug, PartnerRole::Admin).await?;

    let current = PartnerMembership::find(&state.db, partner.id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Membership not found".to_string()))?;

    require_assignable(actor_role, current.role)?;

    let outcome =
        PartnerMembership::apply_guarded(&state.db, partner.id, user_id, MembershipChange::Remove)
            .await?;
    guarded_result(outcome)?;

    info!(actor = %auth.user.id, partner_id = %partner.id, user_id = %user_id, "Member removed");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_vehicles(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(slug): Path<String>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<VehicleList>> {
    let (partner, _) = partner_context(&state, &auth, &slug, PartnerRole::Staff).await?;

    let vehicles =
        Vehicle::list_by_partner(&state.db, partner.id, page.limit(), page.offset()).await?;
    let summary = Vehicle::inventory_summary(&state.db, partner.id).await?;

    Ok(Json(VehicleList { vehicles, summary }))
}

pub async fn create_vehicle(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(slug): Path<String>,
    Json(req): Json<CreateVehicleRequest>,
) -> ApiResult<(StatusCode, Json<Vehicle>)> {
    req.validate()?;
    let currency = req
        .currency
        .clone()
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    if !is_valid_currency(&currency) {
        return Err(ApiError::invalid_field(
            "currency",
            "Currency must be a 3-letter upper-case ISO code",
        ));
    }
    let status = parse_vehicle_status(req.status.as_deref())?.unwrap_or(VehicleStatus::Draft);

    let (partner, _) = partner_context(&state, &auth, &slug, PartnerRole::Staff).await?;

    let vehicle = Vehicle::create(
        &state.db,
        CreateVehicle {
            partner_id: partner.id,
            make: req.make.trim().to_string(),
            model: req.model.trim().to_string(),
            year: req.year,
            price_cents: req.price_cents,
            currency,
            mileage_km: req.mileage_km,
            status,
            description: req.description,
            created_by: Some(auth.user.id),
        },
    )
    .await?;

    info!(
        actor = %auth.user.id,
        partner_id = %partner.id,
        vehicle_id = %vehicle.id,
        status = status.as_str(),
        "Vehicle created"
    );

    Ok((StatusCode::CREATED, Json(vehicle)))
}

pub async fn update_vehicle(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path((slug, id)): Path<(String, Uuid)>,
    Json(req): Json<UpdateVehicleRequest>,
) -> ApiResult<Json<Vehicle>> {
    req.validate()?;
    let status = parse_vehicle_status(req.status.as_deref())?;

    let (partner, _) = partner_context(&state, &auth, &slug, PartnerRole::Staff).await?;

    let vehicle = Vehicle::update(
        &state.db,
        partner.id,
        id,
        UpdateVehicle {
            make: req.make.map(|m| m.trim().to_string()),
            model: req.model.map(|m| m.trim().to_string()),
            year: req.year,
            price_cents: req.price_cents,
            mileage_km: req.mileage_km,
            status,
            description: req.description,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Vehicle not found".to_string()))?;

    info!(actor = %auth.user.id, vehicle_id = %vehicle.id, "Vehicle updated");

    Ok(Json(vehicle))
}

/// Moves a listing between draft, published, sold and archived
pub async fn set_vehicle_status(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path((slug, id)): Path<(String, Uuid)>,
    Json(req): Json<VehicleStatusRequest>,
) -> ApiResult<Json<Vehicle>> {
    let status = VehicleStatus::parse(&req.status).ok_or_else(|| {
        ApiError::invalid_field("status", "Status must be draft, published, sold or archived")
    })?;
    let (partner, _) = partner_context(&state, &auth, &slug, PartnerRole::Staff).await?;

    let vehicle = Vehicle::set_status(&state.db, partner.id, id, status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Vehicle not found".to_string()))?;

    info!(
        actor = %auth.user.id,
        vehicle_id = %vehicle.id,
        status = status.as_str(),
        "Vehicle status changed"
    );

    Ok(Json(vehicle))
}

pub async fn delete_vehicle(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path((slug, id)): Path<(String, Uuid)>,
) -> ApiResult<StatusCode> {
    let (partner, _) = partner_context(&state, &auth, &slug, PartnerRole::Admin).await?;

    if !Vehicle::delete(&state.db, partner.id, id).await? {
        return Err(ApiError::NotFound("Vehicle not found".to_string()));
    }

    info!(actor = %auth.user.id, partner_id = %partner.id, vehicle_id = %id, "Vehicle deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle_request() -> CreateVehicleRequest {
        CreateVehicleRequest {
            make: "Toyota".to_string(),
            model: "Land Cruiser".to_string(),
            year: 2021,
            price_cents: 8_500_000,
            currency: None,
            mileage_km: Some(42_000),
            status: None,
            description: None,
        }
    }

    #[test]
    fn test_vehicle_request_validation() {
        assert!(vehicle_request().validate().is_ok());

        let mut req = vehicle_request();
        req.year = 1800;
        assert!(req.validate().is_err());

        let mut req = vehicle_request();
        req.price_cents = -1;
        assert!(req.validate().is_err());

        let mut req = vehicle_request();
        req.make = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_currency_shape() {
        assert!(is_valid_currency("SAR"));
        assert!(is_valid_currency(DEFAULT_CURRENCY));
        assert!(!is_valid_currency("sar"));
        assert!(!is_valid_currency("DOLLARS"));
        assert!(!is_valid_currency("U$D"));
    }

    #[test]
    fn test_parse_vehicle_status() {
        assert_eq!(parse_vehicle_status(None).unwrap(), None);
        assert_eq!(
            parse_vehicle_status(Some("Published")).unwrap(),
            Some(VehicleStatus::Published)
        );
        assert!(parse_vehicle_status(Some("leased")).is_err());
    }

    #[test]
    fn test_update_request_allows_partial_bodies() {
        let req: UpdateVehicleRequest = serde_json::from_str(r#"{"price_cents": 100}"#).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.price_cents, Some(100));
        assert!(req.make.is_none());
    }
}
