//! # Favorites API Handlers

use axum::{
    extract::{Path, State, rejection::PathRejection},
    response::Json,
};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{ApiError, bad_request, not_found};
use crate::handlers::types::{MessageResponse, PropertyView};
use crate::repositories::{FavoriteRepository, PropertyRepository};
use crate::server::AppState;

/// The caller's favorite properties
#[utoipa::path(
    get,
    path = "/api/favorites",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Favorite properties, most recent first", body = [PropertyView]),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    tag = "favorites"
)]
pub async fn list_favorites(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<PropertyView>>, ApiError> {
    let properties = FavoriteRepository::new(&state.db)
        .list_properties(current.id())
        .await?;

    Ok(Json(properties.iter().map(PropertyView::from).collect()))
}

/// Add a property to the caller's favorites
#[utoipa::path(
    post,
    path = "/api/favorites/{propertyId}",
    security(("bearer_auth" = [])),
    params(("propertyId" = Uuid, Path, description = "Property id")),
    responses(
        (status = 200, description = "Added", body = MessageResponse),
        (status = 400, description = "Already a favorite", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Property not found", body = ApiError)
    ),
    tag = "favorites"
)]
pub async fn add_favorite(
    State(state): State<AppState>,
    current: CurrentUser,
    property_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(property_id) = property_id?;

    if !PropertyRepository::new(&state.db).exists(property_id).await? {
        return Err(not_found("Property"));
    }

    let favorites = FavoriteRepository::new(&state.db);
    if favorites.exists(current.id(), property_id).await? {
        return Err(bad_request(
            "ALREADY_FAVORITE",
            "Property is already in favorites",
        ));
    }
    favorites.add(current.id(), property_id).await?;

    Ok(Json(MessageResponse::new("Property added to favorites")))
}

/// Remove a property from the caller's favorites
#[utoipa::path(
    delete,
    path = "/api/favorites/{propertyId}",
    security(("bearer_auth" = [])),
    params(("propertyId" = Uuid, Path, description = "Property id")),
    responses(
        (status = 200, description = "Removed", body = MessageResponse),
        (status = 400, description = "Not a favorite", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Property not found", body = ApiError)
    ),
    tag = "favorites"
)]
pub async fn remove_favorite(
    State(state): State<AppState>,
    current: CurrentUser,
    property_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(property_id) = property_id?;

    if !PropertyRepository::new(&state.db).exists(property_id).await? {
        return Err(not_found("Property"));
    }

    if !FavoriteRepository::new(&state.db)
        .remove(current.id(), property_id)
        .await?
    {
        return Err(bad_request("NOT_FAVORITE", "Property is not in favorites"));
    }

    Ok(Json(MessageResponse::new("Property removed from favorites")))
}
