//! # User Repository
//!
//! CRUD operations for user accounts.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::user::{self, ActiveModel as UserActiveModel, Model as UserModel};
use crate::models::{Role, User};

/// Data required to create a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: Role,
}

/// Partial update of a user's profile. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.role.is_none()
    }
}

/// Repository for User database operations
pub struct UserRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserModel>, RepositoryError> {
        User::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Looks a user up by email, ignoring case.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, RepositoryError> {
        User::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(&self, new_user: NewUser) -> Result<UserModel, RepositoryError> {
        let now = Utc::now();

        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new_user.name),
            email: Set(normalize_email(&new_user.email)),
            password_hash: Set(new_user.password_hash),
            phone: Set(new_user.phone),
            role: Set(new_user.role),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        user.insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// All users, newest first.
    pub async fn list_all(&self) -> Result<Vec<UserModel>, RepositoryError> {
        User::find()
            .order_by_desc(user::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Users holding the AGENT role, by name.
    pub async fn list_agents(&self) -> Result<Vec<UserModel>, RepositoryError> {
        User::find()
            .filter(user::Column::Role.eq(Role::Agent))
            .order_by_asc(user::Column::Name)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_many(&self, ids: Vec<Uuid>) -> Result<Vec<UserModel>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        User::find()
            .filter(user::Column::Id.is_in(ids))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<UserModel, RepositoryError> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User"))?;

        if changes.is_empty() {
            return Ok(existing);
        }

        let mut active = existing.into_active_model();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(phone) = changes.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(role) = changes.role {
            active.role = Set(role);
        }
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update_password(
        &self,
        id: Uuid,
        password_hash: String,
    ) -> Result<(), RepositoryError> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User"))?;

        let mut active = existing.into_active_model();
        active.password_hash = Set(password_hash);
        active.updated_at = Set(Utc::now().into());
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    /// Deletes a user; owned properties, favorites and messages cascade.
    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = User::delete_by_id(id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("User"));
        }

        Ok(())
    }

    pub async fn count(&self) -> Result<u64, RepositoryError> {
        User::find()
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

/// Emails are stored trimmed and lower-cased so uniqueness is case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
    }

    #[test]
    fn empty_changes_detected() {
        assert!(UserChanges::default().is_empty());
        assert!(
            !UserChanges {
                phone: Some("555".to_string()),
                ..Default::default()
            }
            .is_empty()
        );
    }
}
