//! Business logic layer for the rental marketplace.
//!
//! One service per aggregate: reservations (the booking engine), cars
//! (catalog), payments (ledger + gateway glue), reviews. Services
//! coordinate repositories and collaborators, provide transactional
//! guarantees for the multi-row flows, and translate every failure into
//! the [`ServiceError`] taxonomy the HTTP layer maps to status codes.
//!
//! # Features
//! - Overlap-checked reservation creation and date changes inside a
//!   single transaction per car.
//! - Atomic confirm: payment settled + reservation confirmed + car rented
//!   commit together or not at all.
//! - Best-effort notification dispatch that never fails the primary
//!   operation.
//! - Dependency injection via repository/collaborator traits for
//!   testability.

use deadpool_postgres::PoolError;
use repository::RepositoryError;
use thiserror::Error;

pub mod cars;
pub mod payments;
pub mod reservations;
pub mod reviews;

#[cfg(test)]
mod testing;

pub use cars::{CarService, CarServiceImpl, CreateCar, UpdateCar};
pub use payments::{
    CarPayments, CreatePaymentOrder, PaymentOrder, PaymentService, PaymentServiceImpl,
    VerifyPayment,
};
pub use reservations::{
    ConfirmReservation, CreateReservation, ReservationService, ReservationServiceImpl,
    UpdateReservation,
};
pub use reviews::{CreateReview, ReviewService, ReviewServiceImpl};

/// The main error type for all service operations; each variant carries
/// exactly enough for the HTTP layer to pick a status code without
/// leaking internals.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing input (bad dates, non-positive amounts, ...).
    #[error("Invalid input: {0}")]
    Validation(String),
    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// The operation collides with existing state: overlapping booking,
    /// terminal-status transition, duplicate settled payment.
    #[error("{0}")]
    Conflict(String),
    /// Role or ownership check failed.
    #[error("Access denied: {0}")]
    Authorization(String),
    /// Payment-callback signature did not verify.
    #[error("Invalid payment signature")]
    InvalidSignature,
    /// The gateway reports the payment as not captured/settled.
    #[error("Payment not captured")]
    PaymentNotCaptured,
    /// An external service (payment gateway, geocoding) stayed
    /// unreachable after retries.
    #[error("External service unavailable: {0}")]
    GatewayUnavailable(String),
    /// A repository (database) operation failed.
    #[error("Database error: {0}")]
    Db(RepositoryError),
    /// Failed to obtain a database connection from the pool.
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
    /// Some unexpected or unhandled error.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("record"),
            RepositoryError::Conflict => Self::Conflict("conflicting write".into()),
            other => Self::Db(other),
        }
    }
}

impl ServiceError {
    /// Adapter for repository lookups: names the missing entity instead of
    /// the generic "record".
    pub(crate) fn on_missing(entity: &'static str) -> impl FnOnce(RepositoryError) -> Self {
        move |err| match err {
            RepositoryError::NotFound => Self::NotFound(entity),
            other => other.into(),
        }
    }
}
