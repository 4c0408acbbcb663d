//! # Favorite Repository
//!
//! The user/property favorites relation.

use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{Favorite, favorite};
use crate::repositories::PropertyRepository;
use crate::repositories::property::PropertyDetails;

/// Repository for Favorite database operations
pub struct FavoriteRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> FavoriteRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn exists(&self, user_id: Uuid, property_id: Uuid) -> Result<bool, RepositoryError> {
        let found = Favorite::find_by_id((user_id, property_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(found.is_some())
    }

    /// Inserts the pair. A concurrent duplicate surfaces as a unique violation.
    pub async fn add(&self, user_id: Uuid, property_id: Uuid) -> Result<(), RepositoryError> {
        let row = favorite::ActiveModel {
            user_id: Set(user_id),
            property_id: Set(property_id),
            created_at: Set(Utc::now().into()),
        };

        Favorite::insert(row)
            .exec_without_returning(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(user_id = %user_id, property_id = %property_id, "Favorite added");
        Ok(())
    }

    /// Removes the pair, returning whether it existed.
    pub async fn remove(&self, user_id: Uuid, property_id: Uuid) -> Result<bool, RepositoryError> {
        let result = Favorite::delete_by_id((user_id, property_id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if result.rows_affected > 0 {
            tracing::info!(user_id = %user_id, property_id = %property_id, "Favorite removed");
        }
        Ok(result.rows_affected > 0)
    }

    /// The user's favorite properties, most recently favorited first.
    pub async fn list_properties(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PropertyDetails>, RepositoryError> {
        let property_ids: Vec<Uuid> = Favorite::find()
            .select_only()
            .column(favorite::Column::PropertyId)
            .filter(favorite::Column::UserId.eq(user_id))
            .order_by_desc(favorite::Column::CreatedAt)
            .into_tuple()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        PropertyRepository::new(self.db)
            .find_many_ordered(&property_ids)
            .await
    }
}
