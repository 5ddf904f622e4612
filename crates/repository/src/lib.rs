//! # Data Repository Layer
//!
//! This module provides repository traits and PostgreSQL implementations
//! for all entities: users, cars, reservations, payments, reviews.
//! Each repository supports both regular and transactional operations
//! for integration with service/business logic.

use thiserror::Error;
use tokio_postgres::error::SqlState;

pub mod cars;
pub mod payments;
pub mod reservations;
pub mod reviews;
pub mod users;

pub use cars::{CarsRepository, PgCarsRepository};
pub use payments::{PaymentsRepository, PgPaymentsRepository};
pub use reservations::{PgReservationsRepository, ReservationsRepository};
pub use reviews::{PgReviewsRepository, ReviewsRepository};
pub use users::{PgUsersRepository, UsersRepository};

/// Error types that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database-related errors, wrapping the underlying PostgreSQL error
    #[error("Database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    /// No result found.
    #[error("Not found")]
    NotFound,
    /// A storage-level constraint rejected the write (overlapping booking
    /// exclusion, duplicate settled payment, duplicate order reference).
    #[error("Constraint violation")]
    Conflict,
}

/// Maps constraint-violation SQLSTATEs on writes to [`RepositoryError::Conflict`]
/// so services can surface them as domain conflicts.
pub(crate) fn map_write_err(err: tokio_postgres::Error) -> RepositoryError {
    match err.code() {
        Some(code)
            if *code == SqlState::EXCLUSION_VIOLATION || *code == SqlState::UNIQUE_VIOLATION =>
        {
            RepositoryError::Conflict
        }
        _ => RepositoryError::Db(err),
    }
}
