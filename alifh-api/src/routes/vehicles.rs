/// Public marketplace endpoints
///
/// No session required. Only published listings of non-suspended partners
/// are visible.
///
/// - `GET /api/vehicles?query&make&min_price_cents&max_price_cents&min_year&partner_slug&limit&offset`
/// - `GET /api/vehicles/:id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use alifh_shared::models::vehicle::{Vehicle, VehicleFilter};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub vehicles: Vec<Vehicle>,
    pub limit: i64,
    pub offset: i64,
}

pub async fn search_vehicles(
    State(state): State<AppState>,
    Query(filter): Query<VehicleFilter>,
) -> ApiResult<Json<SearchResponse>> {
    if let (Some(min), Some(max)) = (filter.min_price_cents, filter.max_price_cents) {
        if min > max {
            return Err(ApiError::invalid_field(
                "min_price_cents",
                "Minimum price must not exceed maximum price",
            ));
        }
    }

    let vehicles = Vehicle::search_published(&state.db, &filter).await?;

    Ok(Json(SearchResponse {
        vehicles,
        limit: filter.page_size(),
        offset: filter.page_offset(),
    }))
}

pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vehicle>> {
    let vehicle = Vehicle::find_published(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Vehicle not found".to_string()))?;

    Ok(Json(vehicle))
}
