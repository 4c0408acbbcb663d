//! # Users API Handlers
//!
//! Account administration and the public agent directory.

use axum::{
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{ApiError, forbidden, not_found};
use crate::handlers::auth::UserResponse;
use crate::handlers::types::{MessageResponse, PropertyView, UserView};
use crate::handlers::validation::FieldErrors;
use crate::models::Role;
use crate::repositories::user::UserChanges;
use crate::repositories::{PropertyRepository, UserRepository};
use crate::server::AppState;

/// A user together with their listings
#[derive(Debug, Serialize, ToSchema)]
pub struct UserWithProperties {
    #[serde(flatten)]
    pub user: UserView,
    pub properties: Vec<PropertyView>,
}

/// Either the full view (self or admin) or the public view
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum UserDetailResponse {
    Full(UserWithProperties),
    Public(UserView),
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    /// Only honoured for admins
    pub role: Option<Role>,
}

/// List all users (admin only)
#[utoipa::path(
    get,
    path = "/api/users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = [UserView]),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Admin access required", body = ApiError)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<UserView>>, ApiError> {
    current.ensure_role(&[Role::Admin])?;

    let users = UserRepository::new(&state.db).list_all().await?;
    Ok(Json(users.iter().map(UserView::from).collect()))
}

/// Public directory of agents with their listings
#[utoipa::path(
    get,
    path = "/api/users/agents/all",
    responses(
        (status = 200, description = "Agents with their properties", body = [UserWithProperties])
    ),
    tag = "users"
)]
pub async fn list_agents(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserWithProperties>>, ApiError> {
    let agents = UserRepository::new(&state.db).list_agents().await?;
    let mut by_owner = PropertyRepository::new(&state.db)
        .list_by_owners(agents.iter().map(|a| a.id).collect())
        .await?;

    Ok(Json(
        agents
            .iter()
            .map(|agent| UserWithProperties {
                user: UserView::from(agent),
                properties: by_owner
                    .remove(&agent.id)
                    .unwrap_or_default()
                    .iter()
                    .map(PropertyView::from)
                    .collect(),
            })
            .collect(),
    ))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The user; self and admins also receive properties", body = UserDetailResponse),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<UserDetailResponse>, ApiError> {
    let Path(id) = id?;

    let user = UserRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("User"))?;

    if current.id() != user.id && !current.is_admin() {
        return Ok(Json(UserDetailResponse::Public(UserView::from(&user))));
    }

    let properties = PropertyRepository::new(&state.db)
        .list_by_owners(vec![user.id])
        .await?
        .remove(&user.id)
        .unwrap_or_default();

    Ok(Json(UserDetailResponse::Full(UserWithProperties {
        user: UserView::from(&user),
        properties: properties.iter().map(PropertyView::from).collect(),
    })))
}

fn ensure_self_or_admin(current: &CurrentUser, target: Uuid) -> Result<(), ApiError> {
    if current.id() == target || current.is_admin() {
        Ok(())
    } else {
        Err(forbidden(Some("You do not have permission to modify this user")))
    }
}

/// Update a user (self or admin)
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Not permitted", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(id) = id?;
    ensure_self_or_admin(&current, id)?;
    let Json(request) = payload?;

    let mut errors = FieldErrors::new();
    if let Some(name) = &request.name {
        errors.length("name", name, 3, Some(50));
    }
    errors.into_result()?;

    let role = if current.is_admin() {
        request.role
    } else {
        if request.role.is_some() {
            tracing::debug!(user_id = %current.id(), "Ignoring role change from non-admin");
        }
        None
    };

    let user = UserRepository::new(&state.db)
        .update(
            id,
            UserChanges {
                name: request.name.map(|n| n.trim().to_string()),
                phone: request.phone.map(|p| p.trim().to_string()),
                role,
            },
        )
        .await?;

    tracing::info!(user_id = %user.id, updated_by = %current.id(), "User updated");
    Ok(Json(UserResponse {
        message: "User updated successfully".to_string(),
        user: UserView::from(&user),
    }))
}

/// Delete a user (self or admin)
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Not permitted", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id?;
    ensure_self_or_admin(&current, id)?;

    // Collect image files of owned listings before the cascade removes their rows.
    let owned = PropertyRepository::new(&state.db)
        .list_by_owners(vec![id])
        .await?
        .remove(&id)
        .unwrap_or_default();
    let urls: Vec<String> = owned
        .iter()
        .flat_map(|details| details.images.iter().map(|image| image.url.clone()))
        .collect();

    UserRepository::new(&state.db).delete(id).await?;
    crate::storage::remove_all(state.images.as_ref(), &urls).await;

    tracing::info!(user_id = %id, deleted_by = %current.id(), "User deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
