//! # Messages API Handlers
//!
//! Inquiries from users to agents about listings, and replies within a thread.

use axum::{
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{ApiError, forbidden, not_found};
use crate::handlers::types::{MessageResponse, MessageView};
use crate::handlers::validation::FieldErrors;
use crate::models::Role;
use crate::repositories::message::{NewMessage, Participants};
use crate::repositories::{MessageRepository, PropertyRepository, UserRepository};
use crate::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// 5 to 1000 characters
    pub content: String,
}

impl SendMessageRequest {
    fn validated_content(self) -> Result<String, ApiError> {
        let mut errors = FieldErrors::new();
        errors.length("content", &self.content, 5, Some(1000));
        errors.into_result()?;
        Ok(self.content.trim().to_string())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SentMessageResponse {
    pub message: String,
    pub data: MessageView,
}

async fn hydrate_one(
    repo: &MessageRepository<'_>,
    message: crate::models::message::Model,
) -> Result<MessageView, ApiError> {
    let details = repo
        .hydrate(vec![message], Participants::BOTH)
        .await?
        .pop()
        .ok_or_else(|| not_found("Message"))?;
    Ok(MessageView::from(&details))
}

/// Messages sent by the caller
#[utoipa::path(
    get,
    path = "/api/messages/user",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sent messages with their agent, newest first", body = [MessageView]),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    tag = "messages"
)]
pub async fn list_sent(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    let repo = MessageRepository::new(&state.db);
    let messages = repo.list_sent(current.id()).await?;
    let details = repo.hydrate(messages, Participants::AGENT).await?;

    Ok(Json(details.iter().map(MessageView::from).collect()))
}

/// Messages addressed to the caller as agent
#[utoipa::path(
    get,
    path = "/api/messages/agent",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Received messages with their sender, newest first", body = [MessageView]),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Agents and admins only", body = ApiError)
    ),
    tag = "messages"
)]
pub async fn list_received(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    current.ensure_role(&[Role::Agent, Role::Admin])?;

    let repo = MessageRepository::new(&state.db);
    let messages = repo.list_received(current.id()).await?;
    let details = repo.hydrate(messages, Participants::SENDER).await?;

    Ok(Json(details.iter().map(MessageView::from).collect()))
}

/// Send a message to an agent about a property
#[utoipa::path(
    post,
    path = "/api/messages/{propertyId}/{agentId}",
    security(("bearer_auth" = [])),
    params(
        ("propertyId" = Uuid, Path, description = "Property id"),
        ("agentId" = Uuid, Path, description = "Recipient agent id")
    ),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = SentMessageResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Property or agent not found", body = ApiError)
    ),
    tag = "messages"
)]
pub async fn send_message(
    State(state): State<AppState>,
    current: CurrentUser,
    ids: Result<Path<(Uuid, Uuid)>, PathRejection>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SentMessageResponse>), ApiError> {
    let Path((property_id, agent_id)) = ids?;
    let Json(request) = payload?;
    let content = request.validated_content()?;

    if !PropertyRepository::new(&state.db).exists(property_id).await? {
        return Err(not_found("Property"));
    }

    let agent = UserRepository::new(&state.db).find_by_id(agent_id).await?;
    if !agent.is_some_and(|agent| agent.role.is_agent_tier()) {
        return Err(not_found("Agent"));
    }

    let repo = MessageRepository::new(&state.db);
    let created = repo
        .create(NewMessage {
            content,
            sender_id: current.id(),
            agent_id,
            property_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SentMessageResponse {
            message: "Message sent successfully".to_string(),
            data: hydrate_one(&repo, created).await?,
        }),
    ))
}

/// Reply within an existing message thread
#[utoipa::path(
    post,
    path = "/api/messages/reply/{messageId}",
    security(("bearer_auth" = [])),
    params(("messageId" = Uuid, Path, description = "Message being replied to")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Reply sent", body = SentMessageResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Not a participant", body = ApiError),
        (status = 404, description = "Message not found", body = ApiError)
    ),
    tag = "messages"
)]
pub async fn reply_message(
    State(state): State<AppState>,
    current: CurrentUser,
    message_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SentMessageResponse>), ApiError> {
    let Path(message_id) = message_id?;
    let Json(request) = payload?;
    let content = request.validated_content()?;

    let repo = MessageRepository::new(&state.db);
    let original = repo
        .find_by_id(message_id)
        .await?
        .ok_or_else(|| not_found("Message"))?;

    if current.id() != original.sender_id && current.id() != original.agent_id {
        return Err(forbidden(Some(
            "You do not have permission to reply to this message",
        )));
    }

    let reply = repo
        .create(NewMessage {
            content,
            sender_id: current.id(),
            agent_id: original.agent_id,
            property_id: original.property_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SentMessageResponse {
            message: "Reply sent successfully".to_string(),
            data: hydrate_one(&repo, reply).await?,
        }),
    ))
}

/// Delete a message (sender or admin)
#[utoipa::path(
    delete,
    path = "/api/messages/{messageId}",
    security(("bearer_auth" = [])),
    params(("messageId" = Uuid, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Not the sender", body = ApiError),
        (status = 404, description = "Message not found", body = ApiError)
    ),
    tag = "messages"
)]
pub async fn delete_message(
    State(state): State<AppState>,
    current: CurrentUser,
    message_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(message_id) = message_id?;

    let repo = MessageRepository::new(&state.db);
    let message = repo
        .find_by_id(message_id)
        .await?
        .ok_or_else(|| not_found("Message"))?;

    if message.sender_id != current.id() && !current.is_admin() {
        return Err(forbidden(Some(
            "You do not have permission to delete this message",
        )));
    }

    repo.delete(message_id).await?;

    tracing::info!(message_id = %message_id, user_id = %current.id(), "Message deleted");
    Ok(Json(MessageResponse::new("Message deleted successfully")))
}
