//! # Auth API Handlers
//!
//! Registration, login and self-service account endpoints.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{CurrentUser, hash_password, verify_password};
use crate::error::{ApiError, bad_request};
use crate::handlers::types::{MessageResponse, UserView};
use crate::handlers::validation::{FieldErrors, is_valid_email};
use crate::models::Role;
use crate::repositories::UserRepository;
use crate::repositories::user::{NewUser, UserChanges};
use crate::server::AppState;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Request payload for account registration
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Display name, 3 to 50 characters
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@example.com")]
    pub email: String,
    /// At least 6 characters
    pub password: String,
    pub phone: Option<String>,
    /// USER (default) or AGENT
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Successful registration or login
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserView,
    /// Bearer token for the `Authorization` header
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub message: String,
    pub user: UserView,
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation failed or email already registered", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(request) = payload?;

    let mut errors = FieldErrors::new();
    errors.length("name", &request.name, 3, Some(50));
    if !is_valid_email(&request.email) {
        errors.add("email", "must be a valid email address");
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }
    let role = request.role.unwrap_or(Role::User);
    if role == Role::Admin {
        errors.add("role", "must be USER or AGENT");
    }
    errors.into_result()?;

    let repo = UserRepository::new(&state.db);
    if repo.find_by_email(&request.email).await?.is_some() {
        return Err(bad_request("EMAIL_TAKEN", "Email is already registered"));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;

    let user = repo
        .create(NewUser {
            name: request.name.trim().to_string(),
            email: request.email,
            password_hash,
            phone: normalize_optional(request.phone),
            role,
        })
        .await?;

    let token = state
        .jwt
        .issue(user.id, user.role)
        .map_err(|e| anyhow::anyhow!("token issuance failed: {e}"))?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            user: UserView::from(&user),
            token,
        }),
    ))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Validation failed or invalid credentials", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = payload?;

    let mut errors = FieldErrors::new();
    if !is_valid_email(&request.email) {
        errors.add("email", "must be a valid email address");
    }
    errors.required("password", &request.password);
    errors.into_result()?;

    let invalid = || bad_request("INVALID_CREDENTIALS", "Invalid credentials");

    let user = UserRepository::new(&state.db)
        .find_by_email(&request.email)
        .await?
        .ok_or_else(invalid)?;

    let matches = verify_password(&request.password, &user.password_hash).map_err(|e| {
        tracing::error!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
        invalid()
    })?;
    if !matches {
        return Err(invalid());
    }

    let token = state
        .jwt
        .issue(user.id, user.role)
        .map_err(|e| anyhow::anyhow!("token issuance failed: {e}"))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        message: "Logged in successfully".to_string(),
        user: UserView::from(&user),
        token,
    }))
}

/// Current authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's account", body = UserView),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn me(current: CurrentUser) -> Json<UserView> {
    Json(UserView::from(&current.0))
}

/// Change the caller's password
#[utoipa::path(
    put,
    path = "/api/auth/password",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Validation failed or wrong current password", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;

    let mut errors = FieldErrors::new();
    errors.required("currentPassword", &request.current_password);
    if request.new_password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "newPassword",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }
    errors.into_result()?;

    let matches = verify_password(&request.current_password, &current.0.password_hash)
        .map_err(|e| anyhow::anyhow!("stored password hash is unreadable: {e}"))?;
    if !matches {
        return Err(bad_request(
            "INVALID_PASSWORD",
            "Current password is incorrect",
        ));
    }

    let password_hash = hash_password(&request.new_password)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    UserRepository::new(&state.db)
        .update_password(current.id(), password_hash)
        .await?;

    tracing::info!(user_id = %current.id(), "Password changed");
    Ok(Json(MessageResponse::new("Password updated successfully")))
}

/// Update the caller's name or phone
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(request) = payload?;

    let mut errors = FieldErrors::new();
    if let Some(name) = &request.name {
        errors.length("name", name, 3, Some(50));
    }
    errors.into_result()?;

    let user = UserRepository::new(&state.db)
        .update(
            current.id(),
            UserChanges {
                name: request.name.map(|n| n.trim().to_string()),
                phone: request.phone.map(|p| p.trim().to_string()),
                role: None,
            },
        )
        .await?;

    Ok(Json(UserResponse {
        message: "Profile updated successfully".to_string(),
        user: UserView::from(&user),
    }))
}

pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
