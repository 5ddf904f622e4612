//! Repository for the payment ledger.
//!
//! Payment rows are append-mostly: they are inserted Pending, flipped to
//! Success by verification, and never deleted — a cancelled reservation
//! keeps its payment trail for audit.

use std::sync::Arc;

use async_trait::async_trait;
use model::Payment;
use tokio_postgres::{Client, Row, Transaction};
use uuid::Uuid;

use crate::RepositoryError;

#[async_trait]
pub trait PaymentsRepository: Send + Sync {
    /// Insert a pending payment attempt. A duplicate gateway order ref
    /// surfaces as [`RepositoryError::Conflict`].
    async fn insert(&self, payment: &Payment) -> Result<(), RepositoryError>;

    /// Look up a payment by its gateway order reference.
    async fn get_by_order_ref(&self, order_ref: &str) -> Result<Payment, RepositoryError>;

    /// Mark the payment settled and store the gateway payment id as the
    /// transaction ref. A second settled payment for the same reservation
    /// violates the partial unique index and surfaces as `Conflict`.
    async fn mark_success(
        &self,
        order_ref: &str,
        transaction_ref: &str,
    ) -> Result<Payment, RepositoryError>;

    /// Transactional variant of [`Self::mark_success`], used by the
    /// reservation confirmation flow.
    async fn mark_success_tx(
        &self,
        tx: &Transaction<'_>,
        order_ref: &str,
        transaction_ref: &str,
    ) -> Result<Payment, RepositoryError>;

    /// Payments taken against one car.
    async fn list_by_car(&self, car_id: Uuid) -> Result<Vec<Payment>, RepositoryError>;

    /// Payments made by one customer.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Payment>, RepositoryError>;

    /// Every payment (admin view).
    async fn list_all(&self) -> Result<Vec<Payment>, RepositoryError>;
}

/// PostgreSQL implementation of the [`PaymentsRepository`] trait.
#[derive(Clone)]
pub struct PgPaymentsRepository {
    db: Arc<Client>,
}

impl PgPaymentsRepository {
    pub fn new(db: Client) -> Self {
        Self { db: Arc::new(db) }
    }
}

const PAYMENT_COLUMNS: &str =
    "id, reservation_id, car_id, user_id, amount, currency, payment_status, \
     payment_method, order_ref, transaction_ref, created_at";

fn payment_from_row(row: &Row) -> Payment {
    Payment {
        id: row.get("id"),
        reservation_id: row.get("reservation_id"),
        car_id: row.get("car_id"),
        user_id: row.get("user_id"),
        amount: row.get("amount"),
        currency: row.get("currency"),
        payment_status: row.get("payment_status"),
        payment_method: row.get("payment_method"),
        order_ref: row.get("order_ref"),
        transaction_ref: row.get("transaction_ref"),
        created_at: row.get("created_at"),
    }
}

const MARK_SUCCESS_QUERY: &str = r#"
    UPDATE payments
    SET payment_status = 'Success', transaction_ref = $2
    WHERE order_ref = $1
    RETURNING id, reservation_id, car_id, user_id, amount, currency, payment_status,
              payment_method, order_ref, transaction_ref, created_at
"#;

#[async_trait]
impl PaymentsRepository for PgPaymentsRepository {
    async fn insert(&self, payment: &Payment) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO payments (
                id, reservation_id, car_id, user_id, amount, currency,
                payment_status, payment_method, order_ref, transaction_ref, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
        "#;
        self.db
            .execute(
                query,
                &[
                    &payment.id,
                    &payment.reservation_id,
                    &payment.car_id,
                    &payment.user_id,
                    &payment.amount,
                    &payment.currency,
                    &payment.payment_status,
                    &payment.payment_method,
                    &payment.order_ref,
                    &payment.transaction_ref,
                    &payment.created_at,
                ],
            )
            .await
            .map_err(crate::map_write_err)?;
        Ok(())
    }

    async fn get_by_order_ref(&self, order_ref: &str) -> Result<Payment, RepositoryError> {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_ref = $1");
        let row = self.db.query_opt(&query, &[&order_ref]).await?;
        match row {
            Some(row) => Ok(payment_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn mark_success(
        &self,
        order_ref: &str,
        transaction_ref: &str,
    ) -> Result<Payment, RepositoryError> {
        let row = self
            .db
            .query_opt(MARK_SUCCESS_QUERY, &[&order_ref, &transaction_ref])
            .await
            .map_err(crate::map_write_err)?;
        match row {
            Some(row) => Ok(payment_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn mark_success_tx(
        &self,
        tx: &Transaction<'_>,
        order_ref: &str,
        transaction_ref: &str,
    ) -> Result<Payment, RepositoryError> {
        let row = tx
            .query_opt(MARK_SUCCESS_QUERY, &[&order_ref, &transaction_ref])
            .await
            .map_err(crate::map_write_err)?;
        match row {
            Some(row) => Ok(payment_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list_by_car(&self, car_id: Uuid) -> Result<Vec<Payment>, RepositoryError> {
        let query = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE car_id = $1 ORDER BY created_at DESC"
        );
        let rows = self.db.query(&query, &[&car_id]).await?;
        Ok(rows.iter().map(payment_from_row).collect())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Payment>, RepositoryError> {
        let query = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = self.db.query(&query, &[&user_id]).await?;
        Ok(rows.iter().map(payment_from_row).collect())
    }

    async fn list_all(&self) -> Result<Vec<Payment>, RepositoryError> {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY created_at DESC");
        let rows = self.db.query(&query, &[]).await?;
        Ok(rows.iter().map(payment_from_row).collect())
    }
}
