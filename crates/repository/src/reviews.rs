//! Repository for reviews.

use std::sync::Arc;

use async_trait::async_trait;
use model::{Review, ReviewTarget};
use tokio_postgres::{Client, Row};
use uuid::Uuid;

use crate::RepositoryError;

#[async_trait]
pub trait ReviewsRepository: Send + Sync {
    async fn insert(&self, review: &Review) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Review, RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Reviews written against one target entity.
    async fn list_for_target(
        &self,
        target: ReviewTarget,
        target_id: Uuid,
    ) -> Result<Vec<Review>, RepositoryError>;

    /// Reviews written by one reviewer.
    async fn list_by_reviewer(&self, reviewer_id: Uuid) -> Result<Vec<Review>, RepositoryError>;

    /// Every review (admin view).
    async fn list_all(&self) -> Result<Vec<Review>, RepositoryError>;
}

/// PostgreSQL implementation of the [`ReviewsRepository`] trait.
#[derive(Clone)]
pub struct PgReviewsRepository {
    db: Arc<Client>,
}

impl PgReviewsRepository {
    pub fn new(db: Client) -> Self {
        Self { db: Arc::new(db) }
    }
}

const REVIEW_COLUMNS: &str = "id, reviewer_id, target_id, target, rating, comment, created_at";

fn review_from_row(row: &Row) -> Review {
    Review {
        id: row.get("id"),
        reviewer_id: row.get("reviewer_id"),
        target_id: row.get("target_id"),
        target: row.get("target"),
        rating: row.get("rating"),
        comment: row.get("comment"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl ReviewsRepository for PgReviewsRepository {
    async fn insert(&self, review: &Review) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO reviews (id, reviewer_id, target_id, target, rating, comment, created_at)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
        "#;
        self.db
            .execute(
                query,
                &[
                    &review.id,
                    &review.reviewer_id,
                    &review.target_id,
                    &review.target,
                    &review.rating,
                    &review.comment,
                    &review.created_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Review, RepositoryError> {
        let query = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        let row = self.db.query_opt(&query, &[&id]).await?;
        match row {
            Some(row) => Ok(review_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let deleted = self
            .db
            .execute("DELETE FROM reviews WHERE id = $1", &[&id])
            .await?;
        if deleted == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_for_target(
        &self,
        target: ReviewTarget,
        target_id: Uuid,
    ) -> Result<Vec<Review>, RepositoryError> {
        let query = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE target = $1 AND target_id = $2 ORDER BY created_at DESC"
        );
        let rows = self.db.query(&query, &[&target, &target_id]).await?;
        Ok(rows.iter().map(review_from_row).collect())
    }

    async fn list_by_reviewer(&self, reviewer_id: Uuid) -> Result<Vec<Review>, RepositoryError> {
        let query = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE reviewer_id = $1 ORDER BY created_at DESC"
        );
        let rows = self.db.query(&query, &[&reviewer_id]).await?;
        Ok(rows.iter().map(review_from_row).collect())
    }

    async fn list_all(&self) -> Result<Vec<Review>, RepositoryError> {
        let query = format!("SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY created_at DESC");
        let rows = self.db.query(&query, &[]).await?;
        Ok(rows.iter().map(review_from_row).collect())
    }
}
