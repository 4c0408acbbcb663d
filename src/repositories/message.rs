//! # Message Repository
//!
//! Inquiries between users and agents about a listing.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::message::{ActiveModel as MessageActiveModel, Model as MessageModel};
use crate::models::{Image, Message, Property, image, message, property, user};
use crate::repositories::UserRepository;

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub content: String,
    pub sender_id: Uuid,
    pub agent_id: Uuid,
    pub property_id: Uuid,
}

/// The listing a message refers to, with its first image.
#[derive(Debug, Clone)]
pub struct PropertySummary {
    pub property: property::Model,
    pub cover_image: Option<image::Model>,
}

/// A message with the related rows a view needs.
#[derive(Debug, Clone)]
pub struct MessageDetails {
    pub message: MessageModel,
    pub property: Option<PropertySummary>,
    pub sender: Option<user::Model>,
    pub agent: Option<user::Model>,
}

/// Which participants to load alongside each message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Participants {
    pub sender: bool,
    pub agent: bool,
}

impl Participants {
    pub const SENDER: Self = Self {
        sender: true,
        agent: false,
    };
    pub const AGENT: Self = Self {
        sender: false,
        agent: true,
    };
    pub const BOTH: Self = Self {
        sender: true,
        agent: true,
    };
}

/// Repository for Message database operations
pub struct MessageRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> MessageRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<MessageModel>, RepositoryError> {
        Message::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(&self, new_message: NewMessage) -> Result<MessageModel, RepositoryError> {
        let row = MessageActiveModel {
            id: Set(Uuid::new_v4()),
            content: Set(new_message.content),
            sender_id: Set(new_message.sender_id),
            agent_id: Set(new_message.agent_id),
            property_id: Set(new_message.property_id),
            created_at: Set(Utc::now().into()),
        };

        let created = row
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(
            message_id = %created.id,
            sender_id = %created.sender_id,
            agent_id = %created.agent_id,
            property_id = %created.property_id,
            "Message stored"
        );
        Ok(created)
    }

    /// Messages sent by `sender_id`, newest first.
    pub async fn list_sent(&self, sender_id: Uuid) -> Result<Vec<MessageModel>, RepositoryError> {
        Message::find()
            .filter(message::Column::SenderId.eq(sender_id))
            .order_by_desc(message::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Messages addressed to `agent_id`, newest first.
    pub async fn list_received(
        &self,
        agent_id: Uuid,
    ) -> Result<Vec<MessageModel>, RepositoryError> {
        Message::find()
            .filter(message::Column::AgentId.eq(agent_id))
            .order_by_desc(message::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = Message::delete_by_id(id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("Message"));
        }
        Ok(())
    }

    /// Attaches property summaries and the requested participants.
    pub async fn hydrate(
        &self,
        messages: Vec<MessageModel>,
        participants: Participants,
    ) -> Result<Vec<MessageDetails>, RepositoryError> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let property_ids: Vec<Uuid> = messages
            .iter()
            .map(|m| m.property_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let properties: HashMap<Uuid, property::Model> = Property::find()
            .filter(property::Column::Id.is_in(property_ids.clone()))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut covers: HashMap<Uuid, image::Model> = HashMap::new();
        for img in Image::find()
            .filter(image::Column::PropertyId.is_in(property_ids))
            .order_by_asc(image::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
        {
            covers.entry(img.property_id).or_insert(img);
        }

        let mut user_ids = BTreeSet::new();
        for m in &messages {
            if participants.sender {
                user_ids.insert(m.sender_id);
            }
            if participants.agent {
                user_ids.insert(m.agent_id);
            }
        }
        let users: HashMap<Uuid, user::Model> = UserRepository::new(self.db)
            .find_many(user_ids.into_iter().collect())
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(messages
            .into_iter()
            .map(|message| MessageDetails {
                property: properties.get(&message.property_id).map(|p| PropertySummary {
                    property: p.clone(),
                    cover_image: covers.get(&p.id).cloned(),
                }),
                sender: participants
                    .sender
                    .then(|| users.get(&message.sender_id).cloned())
                    .flatten(),
                agent: participants
                    .agent
                    .then(|| users.get(&message.agent_id).cloned())
                    .flatten(),
                message,
            })
            .collect())
    }
}
