//! Payment ledger routes.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use model::Role;
use service::{CreatePaymentOrder, VerifyPayment};
use uuid::Uuid;

use crate::{AppState, error::ApiError, extract::CurrentUser};
use crate::handlers::reservations::GatewayCallback;

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreatePaymentOrder>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Customer, Role::Admin])?;
    let order = state.payments.create_order(actor, req).await?;
    Ok(Json(order))
}

pub async fn verify(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<GatewayCallback>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(&[Role::Customer, Role::Admin])?;
    let payment = state
        .payments
        .verify(VerifyPayment {
            order_ref: body.razorpay_order_id,
            payment_ref: body.razorpay_payment_id,
            signature: body.razorpay_signature,
        })
        .await?;
    Ok(Json(serde_json::json!({
        "message": "Payment verified successfully",
        "payment": payment,
    })))
}

pub async fn list_for_car(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Owner, Role::Admin])?;
    let ledger = state.payments.list_for_car(actor, id).await?;
    Ok(Json(ledger))
}

pub async fn admin_list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let payments = state.payments.list_all().await?;
    Ok(Json(payments))
}

pub async fn list_for_customer(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Customer])?;
    let payments = state.payments.list_for_customer(actor).await?;
    Ok(Json(payments))
}
