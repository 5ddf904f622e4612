//! Payment-gateway collaborator.
//!
//! The marketplace talks to a Razorpay-style REST gateway through the
//! narrow [`PaymentGateway`] trait: create an order for an amount, fetch a
//! payment's capture state. Checkout-callback signatures are validated
//! locally in [`signature`]; transient transport failures on the capture
//! fetch are absorbed by a bounded retry ([`retry`]).

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub mod retry;
pub mod signature;

pub use retry::{RetryPolicy, retry_with_backoff};
pub use signature::verify_signature;

/// Settlement state the gateway reports for a captured payment.
const CAPTURED: &str = "captured";

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway could not be reached (after retries, where applicable).
    #[error("gateway unreachable: {0}")]
    Unavailable(String),
    /// The gateway answered with a non-success status.
    #[error("gateway rejected the request: {0}")]
    Rejected(String),
    /// The gateway answered with a body this client cannot interpret.
    #[error("unexpected gateway response: {0}")]
    BadResponse(String),
}

impl GatewayError {
    /// Transport-level failures are worth retrying; rejections are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Order created on the gateway; `order_ref` is echoed back by the
/// checkout callback and recorded on the local payment row.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    #[serde(rename = "id")]
    pub order_ref: String,
}

/// Payment as reported by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayment {
    #[serde(rename = "id")]
    pub payment_ref: String,
    #[serde(rename = "order_id")]
    pub order_ref: Option<String>,
    pub status: String,
    pub amount: Option<i64>,
}

impl GatewayPayment {
    /// Whether funds were collected; required before a reservation may be
    /// confirmed.
    pub fn is_captured(&self) -> bool {
        self.status == CAPTURED
    }
}

/// Narrow contract towards the payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order for `amount` minor units.
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError>;

    /// Fetch the current state of a payment by its gateway id.
    async fn fetch_payment(&self, payment_ref: &str) -> Result<GatewayPayment, GatewayError>;
}

/// HTTP implementation of [`PaymentGateway`] authenticating with the
/// gateway key pair.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    retry: RetryPolicy,
}

impl HttpGateway {
    pub fn new(base_url: String, key_id: String, key_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            key_id,
            key_secret,
            retry: RetryPolicy::default(),
        }
    }

    async fn fetch_payment_once(
        &self,
        payment_ref: &str,
    ) -> Result<GatewayPayment, GatewayError> {
        let url = format!("{}/payments/{}", self.base_url, payment_ref);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Rejected(format!(
                "payment fetch returned {}",
                response.status()
            )));
        }

        response
            .json::<GatewayPayment>()
            .await
            .map_err(|e| GatewayError::BadResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/orders", self.base_url);
        let body = serde_json::json!({
            "amount": amount,
            "currency": currency,
            "receipt": receipt,
        });

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Rejected(format!(
                "order create returned {}",
                response.status()
            )));
        }

        let order = response
            .json::<GatewayOrder>()
            .await
            .map_err(|e| GatewayError::BadResponse(e.to_string()))?;

        if order.order_ref.is_empty() {
            return Err(GatewayError::BadResponse(
                "order id missing in gateway response".into(),
            ));
        }

        Ok(order)
    }

    async fn fetch_payment(&self, payment_ref: &str) -> Result<GatewayPayment, GatewayError> {
        retry_with_backoff(
            &self.retry,
            || self.fetch_payment_once(payment_ref),
            |err: &GatewayError| {
                let transient = err.is_transient();
                if transient {
                    warn!(%payment_ref, error = %err, "Retrying gateway payment fetch");
                }
                transient
            },
        )
        .await
    }
}
