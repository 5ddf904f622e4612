//! The reservation engine: booking lifecycle, overlap checking, pricing,
//! and car-status synchronization.
//!
//! The overlap-check-then-insert sequence and every status transition
//! touching both the reservation and its car run inside a single
//! transaction, with the car row locked first where no reservation row
//! exists yet and the reservation row locked first everywhere else.
//! Notification dispatch happens after commit and never affects the
//! operation's outcome.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use deadpool_postgres::Pool;
use gateway::{GatewayError, PaymentGateway, verify_signature};
use identity::AuthUser;
use model::{
    AdminBooking, Car, Reservation, ReservationDetail, ReservationStatus, ReservationView,
    ReservationWithCar, Role, UserSummary, rental_price,
};
use notifier::{Notification, Notifier, Template};
use repository::{CarsRepository, PaymentsRepository, ReservationsRepository, UsersRepository};
use serde::Deserialize;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::ServiceError;

/// Booking request as submitted by a customer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservation {
    pub car_id: Uuid,
    pub start_date: String,
    pub end_date: String,
}

/// Date-change request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservation {
    pub start_date: String,
    pub end_date: String,
}

/// Payment-confirmation callback payload, already stripped of the
/// gateway-specific field names.
#[derive(Debug, Clone)]
pub struct ConfirmReservation {
    pub order_ref: String,
    pub payment_ref: String,
    pub signature: String,
}

/// Trait describing the reservation engine operations.
#[async_trait]
pub trait ReservationService: Send + Sync {
    /// Create a pending reservation after availability and role checks.
    /// The car's status does not change until payment confirms the
    /// booking.
    async fn create(
        &self,
        actor: AuthUser,
        req: CreateReservation,
    ) -> Result<ReservationWithCar, ServiceError>;

    /// Fetch one reservation, enriched with car and customer. Visible to
    /// the booking's customer, the car's owner, and admins.
    async fn get(&self, actor: AuthUser, id: Uuid) -> Result<ReservationDetail, ServiceError>;

    /// Reservations placed by the calling user.
    async fn list_for_user(
        &self,
        actor: AuthUser,
    ) -> Result<Vec<ReservationWithCar>, ServiceError>;

    /// Reservations against one car; restricted to its owner (or admin).
    async fn list_for_car(
        &self,
        actor: AuthUser,
        car_id: Uuid,
    ) -> Result<Vec<ReservationDetail>, ServiceError>;

    /// Every reservation, enriched (admin).
    async fn list_all(&self) -> Result<Vec<ReservationDetail>, ServiceError>;

    /// Every reservation with owner contact details (admin).
    async fn admin_bookings(&self) -> Result<Vec<AdminBooking>, ServiceError>;

    /// Change a booking's date range; re-runs the overlap check and
    /// reprices from the car's current daily rate.
    async fn update(
        &self,
        actor: AuthUser,
        id: Uuid,
        req: UpdateReservation,
    ) -> Result<ReservationView, ServiceError>;

    /// Soft-cancel: terminal status, end date stamped to today, car
    /// freed.
    async fn cancel(&self, actor: AuthUser, id: Uuid) -> Result<(), ServiceError>;

    /// Payment-gateway confirmation callback. Verifies the signature and
    /// the capture state, then atomically settles the payment, confirms
    /// the reservation and rents the car. Idempotent for an
    /// already-confirmed reservation.
    async fn confirm(
        &self,
        id: Uuid,
        req: ConfirmReservation,
    ) -> Result<ReservationView, ServiceError>;

    /// Car return: reservation completed, car freed. Owner/admin only.
    async fn complete(
        &self,
        actor: AuthUser,
        car_id: Uuid,
        reservation_id: Uuid,
    ) -> Result<(), ServiceError>;

    /// Hard delete — the administrative correction path, distinct from
    /// cancel. Frees the car.
    async fn purge(&self, actor: AuthUser, id: Uuid) -> Result<(), ServiceError>;
}

/// Async implementation of [`ReservationService`] over the repository
/// traits.
pub struct ReservationServiceImpl<R1, R2, R3, R4> {
    db_pool: Pool,
    cars_repo: R1,
    reservations_repo: R2,
    users_repo: R3,
    payments_repo: R4,
    payment_gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    gateway_secret: Vec<u8>,
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ServiceError::Validation(format!("invalid date '{value}'")))
}

/// Fire-and-forget dispatch; failures are logged, never propagated.
pub(crate) fn spawn_notify(notifier: Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        if let Err(err) = notifier.notify(notification).await {
            warn!(error = ?err, "Notification dispatch failed");
        }
    });
}

impl<R1, R2, R3, R4> ReservationServiceImpl<R1, R2, R3, R4>
where
    R1: CarsRepository,
    R2: ReservationsRepository,
    R3: UsersRepository,
    R4: PaymentsRepository,
{
    pub fn new(
        db_pool: Pool,
        cars_repo: R1,
        reservations_repo: R2,
        users_repo: R3,
        payments_repo: R4,
        payment_gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        gateway_secret: Vec<u8>,
    ) -> Self {
        Self {
            db_pool,
            cars_repo,
            reservations_repo,
            users_repo,
            payments_repo,
            payment_gateway,
            notifier,
            gateway_secret,
        }
    }

    fn booking_data(reservation: &Reservation, car: &Car) -> serde_json::Value {
        serde_json::json!({
            "carName": car.name,
            "startDate": reservation.start_date,
            "endDate": reservation.end_date,
            "totalAmount": reservation.total_amount,
        })
    }

    /// Notify the booking's customer and, when the car is listed by an
    /// owner account, the owner. Lookup failures are logged and swallowed.
    async fn notify_parties(&self, reservation: &Reservation, car: &Car, template: Template) {
        let data = Self::booking_data(reservation, car);

        match self.users_repo.get_by_id(reservation.user_id).await {
            Ok(customer) if customer.role == Role::Customer => {
                spawn_notify(
                    self.notifier.clone(),
                    Notification::new(customer.email, template, data.clone()),
                );
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "Skipping customer notification"),
        }

        match self.users_repo.get_by_id(car.owner_id).await {
            Ok(owner) if owner.role == Role::Owner => {
                spawn_notify(
                    self.notifier.clone(),
                    Notification::new(owner.email, template, data),
                );
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "Skipping owner notification"),
        }
    }

    async fn notify_customer(&self, reservation: &Reservation, car: &Car, template: Template) {
        match self.users_repo.get_by_id(reservation.user_id).await {
            Ok(customer) => {
                spawn_notify(
                    self.notifier.clone(),
                    Notification::new(customer.email, template, Self::booking_data(reservation, car)),
                );
            }
            Err(err) => warn!(error = %err, "Skipping customer notification"),
        }
    }

    async fn detail_for(&self, reservation: &Reservation) -> Result<ReservationDetail, ServiceError> {
        let car = self
            .cars_repo
            .get_by_id(reservation.car_id)
            .await
            .map_err(ServiceError::on_missing("car"))?;
        let user = self
            .users_repo
            .get_by_id(reservation.user_id)
            .await
            .map_err(ServiceError::on_missing("user"))?;
        Ok(ReservationDetail {
            reservation: reservation.view(Utc::now().date_naive()),
            car,
            user: UserSummary::from(&user),
        })
    }
}

#[async_trait]
impl<R1, R2, R3, R4> ReservationService for ReservationServiceImpl<R1, R2, R3, R4>
where
    R1: CarsRepository,
    R2: ReservationsRepository,
    R3: UsersRepository,
    R4: PaymentsRepository,
{
    #[instrument(skip(self, req))]
    async fn create(
        &self,
        actor: AuthUser,
        req: CreateReservation,
    ) -> Result<ReservationWithCar, ServiceError> {
        if actor.role != Role::Customer {
            return Err(ServiceError::Authorization(
                "only customers can book a car".into(),
            ));
        }
        let user = self
            .users_repo
            .get_by_id(actor.user_id)
            .await
            .map_err(ServiceError::on_missing("user"))?;
        if !user.is_approved {
            return Err(ServiceError::Authorization(
                "only approved users can book a car".into(),
            ));
        }

        let start = parse_date(&req.start_date)?;
        let end = parse_date(&req.end_date)?;
        if end < start {
            return Err(ServiceError::Validation("invalid date range".into()));
        }

        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        // Locking the car row serializes concurrent bookings per car; the
        // exclusion constraint backstops whatever still races past.
        let car = self
            .cars_repo
            .get_by_id_for_update(&tx, req.car_id)
            .await
            .map_err(ServiceError::on_missing("car"))?;

        if self
            .reservations_repo
            .overlapping_exists_tx(&tx, car.id, start, end, None)
            .await?
        {
            return Err(ServiceError::Conflict(
                "car is already reserved for the selected dates".into(),
            ));
        }

        let now = Utc::now();
        let reservation = Reservation {
            id: Uuid::new_v4(),
            car_id: car.id,
            user_id: actor.user_id,
            start_date: start,
            end_date: end,
            total_amount: rental_price(car.daily_rate, start, end),
            status: ReservationStatus::Pending,
            payment_id: None,
            created_at: now,
            updated_at: now,
        };
        self.reservations_repo
            .insert_tx(&tx, &reservation)
            .await
            .map_err(|err| match err {
                repository::RepositoryError::Conflict => ServiceError::Conflict(
                    "car is already reserved for the selected dates".into(),
                ),
                other => other.into(),
            })?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        Ok(ReservationWithCar {
            reservation: reservation.view(now.date_naive()),
            car,
        })
    }

    #[instrument(skip(self))]
    async fn get(&self, actor: AuthUser, id: Uuid) -> Result<ReservationDetail, ServiceError> {
        let reservation = self
            .reservations_repo
            .get_by_id(id)
            .await
            .map_err(ServiceError::on_missing("reservation"))?;
        let car = self
            .cars_repo
            .get_by_id(reservation.car_id)
            .await
            .map_err(ServiceError::on_missing("car"))?;

        let is_customer = actor.user_id == reservation.user_id;
        let is_car_owner = actor.user_id == car.owner_id;
        if !(actor.is_admin() || is_customer || is_car_owner) {
            return Err(ServiceError::Authorization("access denied".into()));
        }

        let user = self
            .users_repo
            .get_by_id(reservation.user_id)
            .await
            .map_err(ServiceError::on_missing("user"))?;
        Ok(ReservationDetail {
            reservation: reservation.view(Utc::now().date_naive()),
            car,
            user: UserSummary::from(&user),
        })
    }

    #[instrument(skip(self))]
    async fn list_for_user(
        &self,
        actor: AuthUser,
    ) -> Result<Vec<ReservationWithCar>, ServiceError> {
        let reservations = self.reservations_repo.list_by_user(actor.user_id).await?;
        let today = Utc::now().date_naive();

        let mut enriched = Vec::with_capacity(reservations.len());
        for reservation in reservations {
            match self.cars_repo.get_by_id(reservation.car_id).await {
                Ok(car) => enriched.push(ReservationWithCar {
                    reservation: reservation.view(today),
                    car,
                }),
                Err(err) => {
                    warn!(reservation_id = %reservation.id, error = %err, "Skipping reservation with unresolvable car")
                }
            }
        }
        Ok(enriched)
    }

    #[instrument(skip(self))]
    async fn list_for_car(
        &self,
        actor: AuthUser,
        car_id: Uuid,
    ) -> Result<Vec<ReservationDetail>, ServiceError> {
        let car = self
            .cars_repo
            .get_by_id(car_id)
            .await
            .map_err(ServiceError::on_missing("car"))?;
        if !(actor.is_admin() || actor.user_id == car.owner_id) {
            return Err(ServiceError::Authorization("access denied".into()));
        }

        let reservations = self.reservations_repo.list_by_car(car_id).await?;
        let today = Utc::now().date_naive();

        let mut enriched = Vec::with_capacity(reservations.len());
        for reservation in reservations {
            match self.users_repo.get_by_id(reservation.user_id).await {
                Ok(user) => enriched.push(ReservationDetail {
                    reservation: reservation.view(today),
                    car: car.clone(),
                    user: UserSummary::from(&user),
                }),
                Err(err) => {
                    warn!(reservation_id = %reservation.id, error = %err, "Skipping reservation with unresolvable customer")
                }
            }
        }
        Ok(enriched)
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<ReservationDetail>, ServiceError> {
        let reservations = self.reservations_repo.list_all().await?;

        let mut enriched = Vec::with_capacity(reservations.len());
        for reservation in reservations {
            match self.detail_for(&reservation).await {
                Ok(detail) => enriched.push(detail),
                Err(err) => {
                    warn!(reservation_id = %reservation.id, error = %err, "Skipping unresolvable reservation")
                }
            }
        }
        Ok(enriched)
    }

    #[instrument(skip(self))]
    async fn admin_bookings(&self) -> Result<Vec<AdminBooking>, ServiceError> {
        let reservations = self.reservations_repo.list_all().await?;
        let today = Utc::now().date_naive();

        let mut bookings = Vec::with_capacity(reservations.len());
        for reservation in reservations {
            let car = match self.cars_repo.get_by_id(reservation.car_id).await {
                Ok(car) => car,
                Err(err) => {
                    warn!(reservation_id = %reservation.id, error = %err, "Skipping booking with unresolvable car");
                    continue;
                }
            };
            let customer = match self.users_repo.get_by_id(reservation.user_id).await {
                Ok(user) => user,
                Err(err) => {
                    warn!(reservation_id = %reservation.id, error = %err, "Skipping booking with unresolvable customer");
                    continue;
                }
            };
            let owner = match self.users_repo.get_by_id(car.owner_id).await {
                Ok(user) => user,
                Err(err) => {
                    warn!(car_id = %car.id, error = %err, "Skipping booking with unresolvable owner");
                    continue;
                }
            };
            bookings.push(AdminBooking {
                reservation: reservation.view(today),
                car,
                customer: UserSummary::from(&customer),
                owner: UserSummary::from(&owner),
            });
        }
        Ok(bookings)
    }

    #[instrument(skip(self, req))]
    async fn update(
        &self,
        actor: AuthUser,
        id: Uuid,
        req: UpdateReservation,
    ) -> Result<ReservationView, ServiceError> {
        let start = parse_date(&req.start_date)?;
        let end = parse_date(&req.end_date)?;
        if end <= start {
            return Err(ServiceError::Validation(
                "end date must be after start date".into(),
            ));
        }

        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let reservation = self
            .reservations_repo
            .get_by_id_for_update(&tx, id)
            .await
            .map_err(ServiceError::on_missing("reservation"))?;

        if !(actor.is_admin() || actor.user_id == reservation.user_id) {
            return Err(ServiceError::Authorization("access denied".into()));
        }
        if reservation.status.is_terminal() {
            return Err(ServiceError::Conflict(
                "reservation is already cancelled or completed".into(),
            ));
        }

        let car = self
            .cars_repo
            .get_by_id_for_update(&tx, reservation.car_id)
            .await
            .map_err(ServiceError::on_missing("car"))?;

        // Date changes go through the same overlap gate as creation,
        // excluding the reservation's own row.
        if self
            .reservations_repo
            .overlapping_exists_tx(&tx, car.id, start, end, Some(reservation.id))
            .await?
        {
            return Err(ServiceError::Conflict(
                "car is already reserved for the selected dates".into(),
            ));
        }

        let total_amount = rental_price(car.daily_rate, start, end);
        self.reservations_repo
            .update_dates_tx(&tx, reservation.id, start, end, total_amount)
            .await
            .map_err(|err| match err {
                repository::RepositoryError::Conflict => ServiceError::Conflict(
                    "car is already reserved for the selected dates".into(),
                ),
                other => other.into(),
            })?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        let updated = Reservation {
            start_date: start,
            end_date: end,
            total_amount,
            ..reservation
        };
        self.notify_parties(&updated, &car, Template::ReservationUpdated)
            .await;

        Ok(updated.view(Utc::now().date_naive()))
    }

    #[instrument(skip(self))]
    async fn cancel(&self, actor: AuthUser, id: Uuid) -> Result<(), ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let reservation = self
            .reservations_repo
            .get_by_id_for_update(&tx, id)
            .await
            .map_err(ServiceError::on_missing("reservation"))?;
        let car = self
            .cars_repo
            .get_by_id_for_update(&tx, reservation.car_id)
            .await
            .map_err(ServiceError::on_missing("car"))?;

        let is_customer = actor.user_id == reservation.user_id;
        let is_car_owner = actor.user_id == car.owner_id;
        if !(actor.is_admin() || is_customer || is_car_owner) {
            return Err(ServiceError::Authorization("access denied".into()));
        }
        if reservation.status.is_terminal() {
            return Err(ServiceError::Conflict(
                "reservation is already cancelled or completed".into(),
            ));
        }

        let today = Utc::now().date_naive();
        self.reservations_repo
            .update_status_tx(&tx, reservation.id, ReservationStatus::Cancelled, Some(today))
            .await?;
        self.cars_repo
            .set_status_tx(&tx, car.id, model::CarStatus::Available)
            .await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        let cancelled = Reservation {
            status: ReservationStatus::Cancelled,
            end_date: today,
            ..reservation
        };
        self.notify_parties(&cancelled, &car, Template::ReservationCancelled)
            .await;

        Ok(())
    }

    #[instrument(skip(self, req))]
    async fn confirm(
        &self,
        id: Uuid,
        req: ConfirmReservation,
    ) -> Result<ReservationView, ServiceError> {
        // No mutation before the signature verifies.
        if !verify_signature(
            &self.gateway_secret,
            &req.order_ref,
            &req.payment_ref,
            &req.signature,
        ) {
            return Err(ServiceError::InvalidSignature);
        }

        // The capture-state fetch retries transient transport failures
        // internally; anything still unreachable is a 502-class error,
        // distinct from "the gateway answered and the money is not there".
        let gateway_payment = self
            .payment_gateway
            .fetch_payment(&req.payment_ref)
            .await
            .map_err(|err| match err {
                GatewayError::Unavailable(msg) => ServiceError::GatewayUnavailable(msg),
                other => ServiceError::Unexpected(other.to_string()),
            })?;
        if !gateway_payment.is_captured() {
            return Err(ServiceError::PaymentNotCaptured);
        }
        if let Some(gateway_order) = &gateway_payment.order_ref {
            if *gateway_order != req.order_ref {
                return Err(ServiceError::Conflict(
                    "payment does not belong to this order".into(),
                ));
            }
        }

        let today = Utc::now().date_naive();

        // Replayed callback for an already-confirmed booking: nothing to
        // do, and no transaction needed.
        let existing = self
            .reservations_repo
            .get_by_id(id)
            .await
            .map_err(ServiceError::on_missing("reservation"))?;
        if existing.status == ReservationStatus::Confirmed {
            return Ok(existing.view(today));
        }
        if existing.status.is_terminal() {
            return Err(ServiceError::Conflict(
                "reservation is already cancelled or completed".into(),
            ));
        }

        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let reservation = self
            .reservations_repo
            .get_by_id_for_update(&tx, id)
            .await
            .map_err(ServiceError::on_missing("reservation"))?;

        // Re-check under the row lock; the status may have moved between
        // the fast-path read and here.
        if reservation.status == ReservationStatus::Confirmed {
            return Ok(reservation.view(today));
        }
        if reservation.status.is_terminal() {
            return Err(ServiceError::Conflict(
                "reservation is already cancelled or completed".into(),
            ));
        }

        let payment = self
            .payments_repo
            .get_by_order_ref(&req.order_ref)
            .await
            .map_err(ServiceError::on_missing("payment"))?;
        if payment.reservation_id != reservation.id {
            return Err(ServiceError::Conflict(
                "payment does not fund this reservation".into(),
            ));
        }

        self.payments_repo
            .mark_success_tx(&tx, &req.order_ref, &req.payment_ref)
            .await
            .map_err(|err| match err {
                repository::RepositoryError::Conflict => ServiceError::Conflict(
                    "reservation already has a settled payment".into(),
                ),
                other => ServiceError::on_missing("payment")(other),
            })?;

        let car = self
            .cars_repo
            .get_by_id_for_update(&tx, reservation.car_id)
            .await
            .map_err(ServiceError::on_missing("car"))?;

        self.reservations_repo
            .update_status_tx(&tx, reservation.id, ReservationStatus::Confirmed, None)
            .await?;
        self.cars_repo
            .set_status_tx(&tx, car.id, model::CarStatus::Rented)
            .await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        let confirmed = Reservation {
            status: ReservationStatus::Confirmed,
            ..reservation
        };
        self.notify_parties(&confirmed, &car, Template::ReservationConfirmed)
            .await;

        Ok(confirmed.view(today))
    }

    #[instrument(skip(self))]
    async fn complete(
        &self,
        actor: AuthUser,
        car_id: Uuid,
        reservation_id: Uuid,
    ) -> Result<(), ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let reservation = self
            .reservations_repo
            .get_by_id_for_update(&tx, reservation_id)
            .await
            .map_err(ServiceError::on_missing("reservation"))?;
        if reservation.car_id != car_id {
            return Err(ServiceError::Validation(
                "booking does not belong to this car".into(),
            ));
        }
        let car = self
            .cars_repo
            .get_by_id_for_update(&tx, car_id)
            .await
            .map_err(ServiceError::on_missing("car"))?;

        if !(actor.is_admin() || actor.user_id == car.owner_id) {
            return Err(ServiceError::Authorization("access denied".into()));
        }
        if reservation.status.is_terminal() {
            return Err(ServiceError::Conflict(
                "booking is already completed or cancelled".into(),
            ));
        }

        let today = Utc::now().date_naive();
        self.reservations_repo
            .update_status_tx(&tx, reservation.id, ReservationStatus::Completed, Some(today))
            .await?;
        self.cars_repo
            .set_status_tx(&tx, car.id, model::CarStatus::Available)
            .await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        let completed = Reservation {
            status: ReservationStatus::Completed,
            end_date: today,
            ..reservation
        };
        self.notify_customer(&completed, &car, Template::ReservationCompleted)
            .await;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn purge(&self, actor: AuthUser, id: Uuid) -> Result<(), ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let reservation = self
            .reservations_repo
            .get_by_id_for_update(&tx, id)
            .await
            .map_err(ServiceError::on_missing("reservation"))?;
        let car = self
            .cars_repo
            .get_by_id_for_update(&tx, reservation.car_id)
            .await
            .map_err(ServiceError::on_missing("car"))?;

        let is_customer = actor.user_id == reservation.user_id;
        let is_car_owner = actor.user_id == car.owner_id;
        if !(actor.is_admin() || is_customer || is_car_owner) {
            return Err(ServiceError::Authorization("access denied".into()));
        }

        self.reservations_repo.delete_tx(&tx, reservation.id).await?;
        self.cars_repo
            .set_status_tx(&tx, car.id, model::CarStatus::Available)
            .await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        Ok(())
    }
}
