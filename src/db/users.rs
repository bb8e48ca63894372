//! Database operations for users.

use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::user::{self, ActiveModel, Entity as UserEntity};
use crate::error::{AppError, AppResult};
use crate::models::{name_from_email, User};

use super::DbPool;

impl DbPool {
    /// Find a user by username, creating it if unknown.
    ///
    /// An existing user is returned unchanged even if `email` differs.
    pub async fn get_or_create_user_by_username(
        &self,
        username: &str,
        email: &str,
    ) -> AppResult<User> {
        if let Some(existing) = self.find_user_by_username(username).await? {
            if existing.email != email {
                debug!(
                    "User {} exists with email {}, ignoring {}",
                    username, existing.email, email
                );
            }
            return Ok(existing);
        }

        let (first_name, last_name) = name_from_email(email);
        let id = Uuid::new_v4();

        let model = ActiveModel {
            id: Set(id),
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            first_name: Set(first_name),
            last_name: Set(last_name),
            created_at: Set(Utc::now()),
        };

        UserEntity::insert(model)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert user: {}", e)))?;
        info!("Created user {}", username);

        // Fetch back the inserted user
        self.find_user_by_username(username).await?.ok_or_else(|| {
            AppError::Database("Failed to fetch newly inserted user".to_string())
        })
    }

    /// Find a user by username.
    pub async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(self.connection())
            .await?;

        Ok(result.map(model_to_user))
    }
}

fn model_to_user(m: user::Model) -> User {
    User {
        id: m.id,
        username: m.username,
        email: m.email,
        first_name: m.first_name,
        last_name: m.last_name,
        created_at: m.created_at,
    }
}
