//! Review ledger service.
//!
//! Reviews point at a car or a user through a tagged target; existence of
//! the target is checked through a per-type fetcher. Writing a review
//! requires a completed reservation touching the target — the only
//! coupling between the review ledger and the reservation engine.

use async_trait::async_trait;
use chrono::Utc;
use identity::AuthUser;
use model::{Review, ReviewDetail, ReviewTarget, UserSummary};
use serde::Deserialize;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::ServiceError;

const MAX_COMMENT_LEN: usize = 500;

/// New review as submitted by a customer or owner.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReview {
    pub target_id: Uuid,
    #[serde(rename = "type")]
    pub target: ReviewTarget,
    pub rating: i16,
    pub comment: Option<String>,
}

#[async_trait]
pub trait ReviewService: Send + Sync {
    /// Add a review after target-existence and eligibility checks.
    async fn add(&self, actor: AuthUser, req: CreateReview) -> Result<Review, ServiceError>;

    /// Delete a review: its author, the reviewed car's owner, or an
    /// admin.
    async fn delete(&self, actor: AuthUser, review_id: Uuid) -> Result<(), ServiceError>;

    /// Reviews against one target entity.
    async fn list_for_target(
        &self,
        target: ReviewTarget,
        target_id: Uuid,
    ) -> Result<Vec<ReviewDetail>, ServiceError>;

    /// Reviews authored by the caller.
    async fn own_reviews(&self, actor: AuthUser) -> Result<Vec<Review>, ServiceError>;

    /// Every review with reviewer details (admin).
    async fn list_all(&self) -> Result<Vec<ReviewDetail>, ServiceError>;

    /// Reviews against one car.
    async fn car_reviews(&self, car_id: Uuid) -> Result<Vec<ReviewDetail>, ServiceError>;
}

/// Async implementation of [`ReviewService`].
pub struct ReviewServiceImpl<R1, R2, R3, R4> {
    reviews_repo: R1,
    cars_repo: R2,
    users_repo: R3,
    reservations_repo: R4,
}

impl<R1, R2, R3, R4> ReviewServiceImpl<R1, R2, R3, R4>
where
    R1: repository::ReviewsRepository,
    R2: repository::CarsRepository,
    R3: repository::UsersRepository,
    R4: repository::ReservationsRepository,
{
    pub fn new(reviews_repo: R1, cars_repo: R2, users_repo: R3, reservations_repo: R4) -> Self {
        Self {
            reviews_repo,
            cars_repo,
            users_repo,
            reservations_repo,
        }
    }

    /// Per-type existence check for the polymorphic target.
    async fn target_exists(
        &self,
        target: ReviewTarget,
        target_id: Uuid,
    ) -> Result<(), ServiceError> {
        match target {
            ReviewTarget::Car => self
                .cars_repo
                .get_by_id(target_id)
                .await
                .map(|_| ())
                .map_err(ServiceError::on_missing("car")),
            ReviewTarget::User => self
                .users_repo
                .get_by_id(target_id)
                .await
                .map(|_| ())
                .map_err(ServiceError::on_missing("user")),
        }
    }

    /// A reviewer is eligible once a completed reservation links them to
    /// the target: their own booking on the car, or a completed booking
    /// between the two users in either renting direction.
    async fn is_eligible(
        &self,
        reviewer: Uuid,
        target: ReviewTarget,
        target_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let eligible = match target {
            ReviewTarget::Car => {
                self.reservations_repo
                    .has_completed_for_car(reviewer, target_id)
                    .await?
            }
            ReviewTarget::User => {
                self.reservations_repo
                    .has_completed_between_users(reviewer, target_id)
                    .await?
            }
        };
        Ok(eligible)
    }

    async fn with_reviewer(&self, review: Review) -> ReviewDetail {
        let reviewer = match self.users_repo.get_by_id(review.reviewer_id).await {
            Ok(user) => Some(UserSummary::from(&user)),
            Err(err) => {
                warn!(review_id = %review.id, error = %err, "Reviewer lookup failed");
                None
            }
        };
        ReviewDetail { review, reviewer }
    }
}

#[async_trait]
impl<R1, R2, R3, R4> ReviewService for ReviewServiceImpl<R1, R2, R3, R4>
where
    R1: repository::ReviewsRepository,
    R2: repository::CarsRepository,
    R3: repository::UsersRepository,
    R4: repository::ReservationsRepository,
{
    #[instrument(skip(self, req))]
    async fn add(&self, actor: AuthUser, req: CreateReview) -> Result<Review, ServiceError> {
        if !(1..=5).contains(&req.rating) {
            return Err(ServiceError::Validation(
                "rating must be between 1 and 5".into(),
            ));
        }
        if req
            .comment
            .as_ref()
            .is_some_and(|c| c.chars().count() > MAX_COMMENT_LEN)
        {
            return Err(ServiceError::Validation(
                "comment exceeds 500 characters".into(),
            ));
        }

        self.target_exists(req.target, req.target_id).await?;

        if !self
            .is_eligible(actor.user_id, req.target, req.target_id)
            .await?
        {
            return Err(ServiceError::Authorization(
                "reviews require a completed reservation with the target".into(),
            ));
        }

        let review = Review {
            id: Uuid::new_v4(),
            reviewer_id: actor.user_id,
            target_id: req.target_id,
            target: req.target,
            rating: req.rating,
            comment: req.comment,
            created_at: Utc::now(),
        };
        self.reviews_repo.insert(&review).await?;
        Ok(review)
    }

    #[instrument(skip(self))]
    async fn delete(&self, actor: AuthUser, review_id: Uuid) -> Result<(), ServiceError> {
        let review = self
            .reviews_repo
            .get_by_id(review_id)
            .await
            .map_err(ServiceError::on_missing("review"))?;

        let mut allowed = actor.is_admin() || review.reviewer_id == actor.user_id;
        if !allowed && review.target == ReviewTarget::Car {
            // The reviewed car's owner may remove reviews on their listing.
            if let Ok(car) = self.cars_repo.get_by_id(review.target_id).await {
                allowed = car.owner_id == actor.user_id;
            }
        }
        if !allowed {
            return Err(ServiceError::Authorization(
                "you are not authorized to delete this review".into(),
            ));
        }

        self.reviews_repo
            .delete(review_id)
            .await
            .map_err(ServiceError::on_missing("review"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_for_target(
        &self,
        target: ReviewTarget,
        target_id: Uuid,
    ) -> Result<Vec<ReviewDetail>, ServiceError> {
        let reviews = self.reviews_repo.list_for_target(target, target_id).await?;
        let mut enriched = Vec::with_capacity(reviews.len());
        for review in reviews {
            enriched.push(self.with_reviewer(review).await);
        }
        Ok(enriched)
    }

    #[instrument(skip(self))]
    async fn own_reviews(&self, actor: AuthUser) -> Result<Vec<Review>, ServiceError> {
        Ok(self.reviews_repo.list_by_reviewer(actor.user_id).await?)
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<ReviewDetail>, ServiceError> {
        let reviews = self.reviews_repo.list_all().await?;
        let mut enriched = Vec::with_capacity(reviews.len());
        for review in reviews {
            enriched.push(self.with_reviewer(review).await);
        }
        Ok(enriched)
    }

    #[instrument(skip(self))]
    async fn car_reviews(&self, car_id: Uuid) -> Result<Vec<ReviewDetail>, ServiceError> {
        self.list_for_target(ReviewTarget::Car, car_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use model::ReservationStatus;

    fn service(
        fixtures: &Fixtures,
    ) -> ReviewServiceImpl<InMemoryReviews, InMemoryCars, InMemoryUsers, InMemoryReservations>
    {
        ReviewServiceImpl::new(
            fixtures.reviews.clone(),
            fixtures.cars.clone(),
            fixtures.users.clone(),
            fixtures.reservations.clone(),
        )
    }

    fn car_review(fixtures: &Fixtures, rating: i16) -> CreateReview {
        CreateReview {
            target_id: fixtures.car_id,
            target: ReviewTarget::Car,
            rating,
            comment: Some("Smooth ride".into()),
        }
    }

    #[tokio::test]
    async fn test_add_rejects_out_of_range_rating() {
        let fixtures = Fixtures::new();
        let svc = service(&fixtures);
        for rating in [0, 6, -1] {
            let err = svc
                .add(fixtures.customer(), car_review(&fixtures, rating))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_add_rejects_oversized_comment() {
        let fixtures = Fixtures::new();
        fixtures.seed_reservation(ReservationStatus::Completed);
        let svc = service(&fixtures);
        let req = CreateReview {
            comment: Some("x".repeat(501)),
            ..car_review(&fixtures, 4)
        };
        let err = svc.add(fixtures.customer(), req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_add_requires_existing_target() {
        let fixtures = Fixtures::new();
        let svc = service(&fixtures);
        let req = CreateReview {
            target_id: Uuid::new_v4(),
            target: ReviewTarget::Car,
            rating: 4,
            comment: None,
        };
        let err = svc.add(fixtures.customer(), req).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("car")));
    }

    #[tokio::test]
    async fn test_add_requires_completed_reservation() {
        let fixtures = Fixtures::new();
        // Only a pending reservation exists; not eligible yet.
        fixtures.seed_reservation(ReservationStatus::Pending);
        let svc = service(&fixtures);
        let err = svc
            .add(fixtures.customer(), car_review(&fixtures, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_add_succeeds_after_completed_reservation() {
        let fixtures = Fixtures::new();
        fixtures.seed_reservation(ReservationStatus::Completed);
        let svc = service(&fixtures);
        let review = svc
            .add(fixtures.customer(), car_review(&fixtures, 5))
            .await
            .unwrap();
        assert_eq!(review.rating, 5);
        assert_eq!(review.target, ReviewTarget::Car);
    }

    #[tokio::test]
    async fn test_user_review_eligibility_links_renter_and_owner() {
        let fixtures = Fixtures::new();
        fixtures.seed_reservation(ReservationStatus::Completed);
        let svc = service(&fixtures);

        // Customer reviews the owner they rented from.
        let review = svc
            .add(
                fixtures.customer(),
                CreateReview {
                    target_id: fixtures.owner().user_id,
                    target: ReviewTarget::User,
                    rating: 4,
                    comment: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(review.target, ReviewTarget::User);

        // Owner reviews the customer who rented their car.
        assert!(
            svc.add(
                fixtures.owner(),
                CreateReview {
                    target_id: fixtures.customer().user_id,
                    target: ReviewTarget::User,
                    rating: 5,
                    comment: None,
                },
            )
            .await
            .is_ok()
        );

        // An unrelated user is not eligible.
        let err = svc
            .add(
                fixtures.stranger(),
                CreateReview {
                    target_id: fixtures.owner().user_id,
                    target: ReviewTarget::User,
                    rating: 1,
                    comment: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_delete_authorization_matrix() {
        let fixtures = Fixtures::new();
        fixtures.seed_reservation(ReservationStatus::Completed);
        let svc = service(&fixtures);

        let review = svc
            .add(fixtures.customer(), car_review(&fixtures, 3))
            .await
            .unwrap();

        // Unrelated user cannot delete.
        let err = svc
            .delete(fixtures.stranger(), review.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));

        // The reviewed car's owner can.
        assert!(svc.delete(fixtures.owner(), review.id).await.is_ok());

        // And the author can delete their own.
        let review = svc
            .add(fixtures.customer(), car_review(&fixtures, 3))
            .await
            .unwrap();
        assert!(svc.delete(fixtures.customer(), review.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_listings_carry_reviewer_details() {
        let fixtures = Fixtures::new();
        fixtures.seed_reservation(ReservationStatus::Completed);
        let svc = service(&fixtures);
        svc.add(fixtures.customer(), car_review(&fixtures, 4))
            .await
            .unwrap();

        let listed = svc.car_reviews(fixtures.car_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(
            listed[0].reviewer.as_ref().map(|r| r.id),
            Some(fixtures.customer().user_id)
        );

        let own = svc.own_reviews(fixtures.customer()).await.unwrap();
        assert_eq!(own.len(), 1);
    }
}
