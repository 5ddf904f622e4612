//! Repository for reservations.
//!
//! The transactional variants exist so the service layer can run the
//! overlap-check-then-insert sequence and the multi-row status updates as
//! single transactions. The overlap query mirrors the storage constraint:
//! `existing.start < new.end AND existing.end > new.start` over
//! non-terminal reservations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use model::{Reservation, ReservationStatus};
use tokio_postgres::{Client, Row, Transaction};
use uuid::Uuid;

use crate::RepositoryError;

#[async_trait]
pub trait ReservationsRepository: Send + Sync {
    /// Insert a reservation inside a transaction. The exclusion constraint
    /// doubles as the last line of defense against a concurrent
    /// double-booking; violations surface as [`RepositoryError::Conflict`].
    async fn insert_tx(
        &self,
        tx: &Transaction<'_>,
        reservation: &Reservation,
    ) -> Result<(), RepositoryError>;

    /// Get a reservation by id.
    async fn get_by_id(&self, id: Uuid) -> Result<Reservation, RepositoryError>;

    /// Get a reservation by id inside a transaction, locking the row.
    async fn get_by_id_for_update(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Reservation, RepositoryError>;

    /// True if any non-terminal reservation for `car_id` overlaps
    /// `[start, end]`, excluding `exclude` (used when re-validating a date
    /// change against the reservation's own row).
    async fn overlapping_exists_tx(
        &self,
        tx: &Transaction<'_>,
        car_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<bool, RepositoryError>;

    /// Update the lifecycle status, optionally stamping a new end date
    /// (cancellation and completion overwrite it with today).
    async fn update_status_tx(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
        status: ReservationStatus,
        end_date: Option<NaiveDate>,
    ) -> Result<(), RepositoryError>;

    /// Rewrite the date range and the derived amount.
    async fn update_dates_tx(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        total_amount: i64,
    ) -> Result<(), RepositoryError>;

    /// Hard delete (administrative correction path, not the cancel flow).
    async fn delete_tx(&self, tx: &Transaction<'_>, id: Uuid) -> Result<(), RepositoryError>;

    /// Reservations placed by one customer.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Reservation>, RepositoryError>;

    /// Reservations against one car.
    async fn list_by_car(&self, car_id: Uuid) -> Result<Vec<Reservation>, RepositoryError>;

    /// Every reservation (admin view).
    async fn list_all(&self) -> Result<Vec<Reservation>, RepositoryError>;

    /// True if `user_id` has a completed reservation on `car_id`
    /// (review-eligibility read).
    async fn has_completed_for_car(
        &self,
        user_id: Uuid,
        car_id: Uuid,
    ) -> Result<bool, RepositoryError>;

    /// True if a completed reservation links the two users in either
    /// direction (one rented a car the other owns).
    async fn has_completed_between_users(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> Result<bool, RepositoryError>;

    /// Re-derive every car's Available/Rented flag from the presence of
    /// confirmed reservations. Returns the number of corrected rows.
    async fn reconcile_car_statuses(&self) -> Result<u64, RepositoryError>;
}

/// PostgreSQL implementation of the [`ReservationsRepository`] trait.
#[derive(Clone)]
pub struct PgReservationsRepository {
    db: Arc<Client>,
}

impl PgReservationsRepository {
    pub fn new(db: Client) -> Self {
        Self { db: Arc::new(db) }
    }
}

const RESERVATION_COLUMNS: &str =
    "id, car_id, user_id, start_date, end_date, total_amount, status, payment_id, \
     created_at, updated_at";

fn reservation_from_row(row: &Row) -> Reservation {
    Reservation {
        id: row.get("id"),
        car_id: row.get("car_id"),
        user_id: row.get("user_id"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        total_amount: row.get("total_amount"),
        status: row.get("status"),
        payment_id: row.get("payment_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl ReservationsRepository for PgReservationsRepository {
    async fn insert_tx(
        &self,
        tx: &Transaction<'_>,
        reservation: &Reservation,
    ) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO reservations (
                id, car_id, user_id, start_date, end_date, total_amount,
                status, payment_id, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        "#;
        tx.execute(
            query,
            &[
                &reservation.id,
                &reservation.car_id,
                &reservation.user_id,
                &reservation.start_date,
                &reservation.end_date,
                &reservation.total_amount,
                &reservation.status,
                &reservation.payment_id,
                &reservation.created_at,
                &reservation.updated_at,
            ],
        )
        .await
        .map_err(crate::map_write_err)?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Reservation, RepositoryError> {
        let query = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1");
        let row = self.db.query_opt(&query, &[&id]).await?;
        match row {
            Some(row) => Ok(reservation_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn get_by_id_for_update(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Reservation, RepositoryError> {
        let query =
            format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE");
        let row = tx.query_opt(&query, &[&id]).await?;
        match row {
            Some(row) => Ok(reservation_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn overlapping_exists_tx(
        &self,
        tx: &Transaction<'_>,
        car_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<bool, RepositoryError> {
        let query = r#"
            SELECT EXISTS (
                SELECT 1 FROM reservations
                WHERE car_id = $1
                  AND status NOT IN ('cancelled', 'completed')
                  AND start_date < $3
                  AND end_date > $2
                  AND ($4::uuid IS NULL OR id <> $4)
            ) AS conflicting
        "#;
        let row = tx.query_one(query, &[&car_id, &start, &end, &exclude]).await?;
        Ok(row.get("conflicting"))
    }

    async fn update_status_tx(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
        status: ReservationStatus,
        end_date: Option<NaiveDate>,
    ) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE reservations
            SET status = $2, end_date = COALESCE($3, end_date), updated_at = now()
            WHERE id = $1
        "#;
        let updated = tx.execute(query, &[&id, &status, &end_date]).await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update_dates_tx(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        total_amount: i64,
    ) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE reservations
            SET start_date = $2, end_date = $3, total_amount = $4, updated_at = now()
            WHERE id = $1
        "#;
        let updated = tx
            .execute(query, &[&id, &start, &end, &total_amount])
            .await
            .map_err(crate::map_write_err)?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_tx(&self, tx: &Transaction<'_>, id: Uuid) -> Result<(), RepositoryError> {
        let deleted = tx
            .execute("DELETE FROM reservations WHERE id = $1", &[&id])
            .await?;
        if deleted == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Reservation>, RepositoryError> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = self.db.query(&query, &[&user_id]).await?;
        Ok(rows.iter().map(reservation_from_row).collect())
    }

    async fn list_by_car(&self, car_id: Uuid) -> Result<Vec<Reservation>, RepositoryError> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE car_id = $1 ORDER BY start_date DESC"
        );
        let rows = self.db.query(&query, &[&car_id]).await?;
        Ok(rows.iter().map(reservation_from_row).collect())
    }

    async fn list_all(&self) -> Result<Vec<Reservation>, RepositoryError> {
        let query =
            format!("SELECT {RESERVATION_COLUMNS} FROM reservations ORDER BY created_at DESC");
        let rows = self.db.query(&query, &[]).await?;
        Ok(rows.iter().map(reservation_from_row).collect())
    }

    async fn has_completed_for_car(
        &self,
        user_id: Uuid,
        car_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        let query = r#"
            SELECT EXISTS (
                SELECT 1 FROM reservations
                WHERE user_id = $1 AND car_id = $2 AND status = 'completed'
            ) AS eligible
        "#;
        let row = self.db.query_one(query, &[&user_id, &car_id]).await?;
        Ok(row.get("eligible"))
    }

    async fn has_completed_between_users(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> Result<bool, RepositoryError> {
        let query = r#"
            SELECT EXISTS (
                SELECT 1
                FROM reservations r
                JOIN cars c ON c.id = r.car_id
                WHERE r.status = 'completed'
                  AND ((r.user_id = $1 AND c.owner_id = $2)
                    OR (r.user_id = $2 AND c.owner_id = $1))
            ) AS eligible
        "#;
        let row = self.db.query_one(query, &[&a, &b]).await?;
        Ok(row.get("eligible"))
    }

    async fn reconcile_car_statuses(&self) -> Result<u64, RepositoryError> {
        let rented = self
            .db
            .execute(
                r#"
                UPDATE cars SET status = 'Rented'
                WHERE status <> 'Rented'
                  AND id IN (SELECT car_id FROM reservations WHERE status = 'confirmed')
                "#,
                &[],
            )
            .await?;
        let freed = self
            .db
            .execute(
                r#"
                UPDATE cars SET status = 'Available'
                WHERE status <> 'Available'
                  AND id NOT IN (SELECT car_id FROM reservations WHERE status = 'confirmed')
                "#,
                &[],
            )
            .await?;
        Ok(rented + freed)
    }
}
