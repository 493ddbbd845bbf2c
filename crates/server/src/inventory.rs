//! Item and location API endpoints

use api_types::{item::ItemsResponse, location::LocationsResponse};
use axum::{Json, extract::State};

use crate::{ServerError, server::ServerState};

/// Handle requests for the transferable item catalog
pub async fn items(State(state): State<ServerState>) -> Result<Json<ItemsResponse>, ServerError> {
    let items = state
        .engine
        .list_items()
        .await
        .map_err(ServerError::failed("Failed to fetch items"))?;

    Ok(Json(ItemsResponse {
        code: 0,
        message: "success".to_string(),
        items,
    }))
}

pub async fn locations(
    State(state): State<ServerState>,
) -> Result<Json<LocationsResponse>, ServerError> {
    let locations = state
        .engine
        .list_locations()
        .await
        .map_err(ServerError::failed("Failed to fetch locations"))?;

    Ok(Json(locations))
}
