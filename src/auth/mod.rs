//! # Authentication and Authorization
//!
//! Bearer-token authentication for protected routes, plus the role and
//! ownership guards handlers apply once the caller is known.

pub mod jwt;
pub mod password;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::{ApiError, forbidden, unauthorized};
use crate::models::{Role, user};
use crate::repositories::UserRepository;
use crate::server::AppState;

pub use jwt::{Claims, JwtManager, TokenError};
pub use password::{hash_password, verify_password};

/// The authenticated caller, loaded fresh from the database on every request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn is_admin(&self) -> bool {
        self.0.role == Role::Admin
    }

    /// Rejects the request with 403 unless the caller holds one of `allowed`.
    pub fn ensure_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.0.role) {
            Ok(())
        } else {
            Err(forbidden(Some("Insufficient permissions")))
        }
    }

    /// Admins always pass; everyone else must own the resource.
    pub fn ensure_owner_or_admin(&self, owner_id: Uuid) -> Result<(), ApiError> {
        if self.is_admin() || self.0.id == owner_id {
            Ok(())
        } else {
            Err(forbidden(Some("You do not have permission to modify this resource")))
        }
    }
}

/// Authentication middleware: validates the bearer token and attaches the
/// matching [`CurrentUser`] to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| unauthorized(Some("Token not provided")))?;

    let claims = state.jwt.validate(token).map_err(|err| match err {
        TokenError::Expired => unauthorized(Some("Token expired")),
        TokenError::Invalid(source) => {
            tracing::debug!(error = %source, "Rejected bearer token");
            unauthorized(Some("Invalid token"))
        }
    })?;

    let user = UserRepository::new(&state.db)
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| unauthorized(Some("User not found")))?;

    tracing::debug!(user_id = %user.id, role = %user.role, "Authenticated request");
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("Token not provided")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use chrono::Utc;

    fn user_with_role(role: Role) -> CurrentUser {
        let now = Utc::now().into();
        CurrentUser(user::Model {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            password_hash: String::new(),
            phone: None,
            role,
            created_at: now,
            updated_at: now,
        })
    }

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dGVzdDoxMjM="));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn role_guard() {
        let agent = user_with_role(Role::Agent);
        assert!(agent.ensure_role(&[Role::Agent, Role::Admin]).is_ok());

        let err = user_with_role(Role::User)
            .ensure_role(&[Role::Agent, Role::Admin])
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn ownership_guard() {
        let agent = user_with_role(Role::Agent);
        assert!(agent.ensure_owner_or_admin(agent.id()).is_ok());
        assert!(agent.ensure_owner_or_admin(Uuid::new_v4()).is_err());

        let admin = user_with_role(Role::Admin);
        assert!(admin.ensure_owner_or_admin(Uuid::new_v4()).is_ok());
    }
}
