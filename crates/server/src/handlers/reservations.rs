//! Reservation lifecycle routes.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use model::Role;
use serde::Deserialize;
use serde_json::json;
use service::{ConfirmReservation, CreateReservation, UpdateReservation};
use uuid::Uuid;

use crate::{AppState, error::ApiError, extract::CurrentUser};

/// Gateway checkout-callback payload, field names as the gateway posts
/// them.
#[derive(Debug, Deserialize)]
pub struct GatewayCallback {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

impl From<GatewayCallback> for ConfirmReservation {
    fn from(body: GatewayCallback) -> Self {
        Self {
            order_ref: body.razorpay_order_id,
            payment_ref: body.razorpay_payment_id,
            signature: body.razorpay_signature,
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateReservation>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Customer])?;
    let created = state.reservations.create(actor, req).await?;
    let booking_id = created.reservation.id;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Reservation created successfully. Please proceed with payment.",
            "reservation": created,
            "bookingId": booking_id,
        })),
    ))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.reservations.get(user.into_inner(), id).await?;
    Ok(Json(detail))
}

pub async fn list_mine(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Customer, Role::Admin, Role::Owner])?;
    let reservations = state.reservations.list_for_user(actor).await?;
    Ok(Json(reservations))
}

pub async fn list_for_car(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Owner, Role::Admin])?;
    let reservations = state.reservations.list_for_car(actor, id).await?;
    Ok(Json(reservations))
}

pub async fn admin_list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let reservations = state.reservations.list_all().await?;
    Ok(Json(reservations))
}

pub async fn admin_bookings(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let bookings = state.reservations.admin_bookings().await?;
    Ok(Json(bookings))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReservation>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .reservations
        .update(user.into_inner(), id, req)
        .await?;
    Ok(Json(json!({
        "message": "Reservation updated successfully.",
        "reservation": updated,
    })))
}

pub async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Owner, Role::Customer, Role::Admin])?;
    state.reservations.cancel(actor, id).await?;
    Ok(Json(json!({
        "message": "Booking cancelled successfully, car status updated to available.",
    })))
}

pub async fn purge(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.reservations.purge(user.into_inner(), id).await?;
    Ok(Json(json!({
        "message": "Reservation deleted successfully, car status updated to available.",
    })))
}

pub async fn confirm(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<GatewayCallback>,
) -> Result<impl IntoResponse, ApiError> {
    let confirmed = state.reservations.confirm(id, body.into()).await?;
    Ok(Json(json!({
        "message": "Reservation confirmed and car status updated",
        "reservation": confirmed,
    })))
}
