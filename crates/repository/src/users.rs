//! Repository for user profiles.
//!
//! Registration and credential management happen in the external identity
//! system; this repository only reads the locally replicated profile rows
//! (role, approval flag, contact data).

use std::sync::Arc;

use async_trait::async_trait;
use model::User;
use tokio_postgres::{Client, Row};
use uuid::Uuid;

use crate::RepositoryError;

#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Get a user profile by id.
    async fn get_by_id(&self, id: Uuid) -> Result<User, RepositoryError>;
}

/// PostgreSQL implementation of the [`UsersRepository`] trait.
#[derive(Clone)]
pub struct PgUsersRepository {
    db: Arc<Client>,
}

impl PgUsersRepository {
    pub fn new(db: Client) -> Self {
        Self { db: Arc::new(db) }
    }
}

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone_no: row.get("phone_no"),
        role: row.get("role"),
        is_approved: row.get("is_approved"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        address: row.get("address"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl UsersRepository for PgUsersRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<User, RepositoryError> {
        let query = r#"
            SELECT id, name, email, phone_no, role, is_approved,
                   latitude, longitude, address, created_at
            FROM users WHERE id = $1
        "#;
        let row = self.db.query_opt(query, &[&id]).await?;
        match row {
            Some(row) => Ok(user_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }
}
