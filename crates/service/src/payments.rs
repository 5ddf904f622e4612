//! Payment ledger service: gateway order creation, callback verification,
//! and the ledger listings.
//!
//! One payment row is recorded per funding attempt, created `Pending`
//! with a locally generated placeholder transaction id and flipped to
//! `Success` only after the callback signature verifies. The partial
//! unique index in the schema guarantees at most one settled payment per
//! reservation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gateway::{GatewayError, PaymentGateway, verify_signature};
use identity::AuthUser;
use model::{Payment, PaymentDetail, PaymentStatus, UserSummary};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::ServiceError;

/// Checkout request: fund `booking_id` on `car_id` with `amount` minor
/// units.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentOrder {
    pub amount: i64,
    pub car_id: Uuid,
    pub booking_id: Uuid,
    pub payment_method: Option<String>,
}

/// Verification callback payload, already stripped of gateway-specific
/// field names.
#[derive(Debug, Clone)]
pub struct VerifyPayment {
    pub order_ref: String,
    pub payment_ref: String,
    pub signature: String,
}

/// What the checkout page needs to open the gateway widget.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub order_id: String,
    /// Publishable gateway key.
    pub key: String,
    pub payment: PaymentDetail,
}

/// Owner/admin per-car ledger view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarPayments {
    pub car: model::Car,
    pub payments: Vec<PaymentDetail>,
}

#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Create a gateway order and record the pending payment attempt.
    async fn create_order(
        &self,
        actor: AuthUser,
        req: CreatePaymentOrder,
    ) -> Result<PaymentOrder, ServiceError>;

    /// Verify a checkout callback and mark the payment settled.
    async fn verify(&self, req: VerifyPayment) -> Result<PaymentDetail, ServiceError>;

    /// Payments against one car (its owner or admin).
    async fn list_for_car(
        &self,
        actor: AuthUser,
        car_id: Uuid,
    ) -> Result<CarPayments, ServiceError>;

    /// Every payment (admin).
    async fn list_all(&self) -> Result<Vec<PaymentDetail>, ServiceError>;

    /// The calling customer's payments.
    async fn list_for_customer(&self, actor: AuthUser) -> Result<Vec<PaymentDetail>, ServiceError>;
}

/// Async implementation of [`PaymentService`].
pub struct PaymentServiceImpl<R1, R2, R3, R4> {
    cars_repo: R1,
    reservations_repo: R2,
    payments_repo: R3,
    users_repo: R4,
    payment_gateway: Arc<dyn PaymentGateway>,
    gateway_key_id: String,
    gateway_secret: Vec<u8>,
    currency: String,
}

/// Locally generated placeholder transaction id, replaced with the
/// gateway payment id at verification.
fn placeholder_transaction_ref() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("temp_{}_{}", Utc::now().timestamp_millis(), suffix.to_lowercase())
}

impl<R1, R2, R3, R4> PaymentServiceImpl<R1, R2, R3, R4>
where
    R1: repository::CarsRepository,
    R2: repository::ReservationsRepository,
    R3: repository::PaymentsRepository,
    R4: repository::UsersRepository,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cars_repo: R1,
        reservations_repo: R2,
        payments_repo: R3,
        users_repo: R4,
        payment_gateway: Arc<dyn PaymentGateway>,
        gateway_key_id: String,
        gateway_secret: Vec<u8>,
        currency: String,
    ) -> Self {
        Self {
            cars_repo,
            reservations_repo,
            payments_repo,
            users_repo,
            payment_gateway,
            gateway_key_id,
            gateway_secret,
            currency,
        }
    }

    /// Attach car and payer details where resolvable; enrichment failures
    /// are logged and leave the field empty rather than failing the read.
    async fn enrich(&self, payment: Payment, with_user: bool) -> PaymentDetail {
        let car = match self.cars_repo.get_by_id(payment.car_id).await {
            Ok(car) => Some(car),
            Err(err) => {
                warn!(payment_id = %payment.id, error = %err, "Payment car lookup failed");
                None
            }
        };
        let user = if with_user {
            match self.users_repo.get_by_id(payment.user_id).await {
                Ok(user) => Some(UserSummary::from(&user)),
                Err(err) => {
                    warn!(payment_id = %payment.id, error = %err, "Payment user lookup failed");
                    None
                }
            }
        } else {
            None
        };
        PaymentDetail { payment, car, user }
    }
}

#[async_trait]
impl<R1, R2, R3, R4> PaymentService for PaymentServiceImpl<R1, R2, R3, R4>
where
    R1: repository::CarsRepository,
    R2: repository::ReservationsRepository,
    R3: repository::PaymentsRepository,
    R4: repository::UsersRepository,
{
    #[instrument(skip(self, req))]
    async fn create_order(
        &self,
        actor: AuthUser,
        req: CreatePaymentOrder,
    ) -> Result<PaymentOrder, ServiceError> {
        if req.amount <= 0 {
            return Err(ServiceError::Validation(
                "amount must be greater than zero".into(),
            ));
        }
        let car = self
            .cars_repo
            .get_by_id(req.car_id)
            .await
            .map_err(ServiceError::on_missing("car"))?;
        self.reservations_repo
            .get_by_id(req.booking_id)
            .await
            .map_err(ServiceError::on_missing("booking"))?;

        let receipt = format!("receipt_{}", Utc::now().timestamp_millis());
        let order = self
            .payment_gateway
            .create_order(req.amount, &self.currency, &receipt)
            .await
            .map_err(|err| match err {
                GatewayError::Unavailable(msg) => ServiceError::GatewayUnavailable(msg),
                other => ServiceError::Unexpected(other.to_string()),
            })?;

        let payment = Payment {
            id: Uuid::new_v4(),
            reservation_id: req.booking_id,
            car_id: req.car_id,
            user_id: actor.user_id,
            amount: req.amount,
            currency: self.currency.clone(),
            payment_status: PaymentStatus::Pending,
            payment_method: req.payment_method,
            order_ref: order.order_ref.clone(),
            transaction_ref: placeholder_transaction_ref(),
            created_at: Utc::now(),
        };
        self.payments_repo
            .insert(&payment)
            .await
            .map_err(|err| match err {
                repository::RepositoryError::Conflict => {
                    ServiceError::Conflict("duplicate gateway order reference".into())
                }
                other => other.into(),
            })?;

        Ok(PaymentOrder {
            order_id: order.order_ref,
            key: self.gateway_key_id.clone(),
            payment: PaymentDetail {
                payment,
                car: Some(car),
                user: None,
            },
        })
    }

    #[instrument(skip(self, req))]
    async fn verify(&self, req: VerifyPayment) -> Result<PaymentDetail, ServiceError> {
        if req.order_ref.is_empty() || req.payment_ref.is_empty() || req.signature.is_empty() {
            return Err(ServiceError::Validation("invalid payment details".into()));
        }
        if !verify_signature(
            &self.gateway_secret,
            &req.order_ref,
            &req.payment_ref,
            &req.signature,
        ) {
            return Err(ServiceError::InvalidSignature);
        }

        let payment = self
            .payments_repo
            .mark_success(&req.order_ref, &req.payment_ref)
            .await
            .map_err(|err| match err {
                repository::RepositoryError::Conflict => ServiceError::Conflict(
                    "reservation already has a settled payment".into(),
                ),
                other => ServiceError::on_missing("payment")(other),
            })?;

        Ok(self.enrich(payment, false).await)
    }

    #[instrument(skip(self))]
    async fn list_for_car(
        &self,
        actor: AuthUser,
        car_id: Uuid,
    ) -> Result<CarPayments, ServiceError> {
        let car = self
            .cars_repo
            .get_by_id(car_id)
            .await
            .map_err(ServiceError::on_missing("car"))?;
        if !(actor.is_admin() || actor.user_id == car.owner_id) {
            return Err(ServiceError::Authorization("access denied".into()));
        }

        let rows = self.payments_repo.list_by_car(car_id).await?;
        let mut payments = Vec::with_capacity(rows.len());
        for payment in rows {
            payments.push(self.enrich(payment, true).await);
        }
        Ok(CarPayments { car, payments })
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<PaymentDetail>, ServiceError> {
        let rows = self.payments_repo.list_all().await?;
        let mut payments = Vec::with_capacity(rows.len());
        for payment in rows {
            payments.push(self.enrich(payment, true).await);
        }
        Ok(payments)
    }

    #[instrument(skip(self))]
    async fn list_for_customer(
        &self,
        actor: AuthUser,
    ) -> Result<Vec<PaymentDetail>, ServiceError> {
        let rows = self.payments_repo.list_by_user(actor.user_id).await?;
        let mut payments = Vec::with_capacity(rows.len());
        for payment in rows {
            payments.push(self.enrich(payment, false).await);
        }
        Ok(payments)
    }
}
