//! Car catalog routes.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use model::Role;
use serde::Deserialize;
use serde_json::json;
use service::{CreateCar, ServiceError, UpdateCar};
use uuid::Uuid;

use crate::{AppState, error::ApiError, extract::CurrentUser};

/// Caller location for the proximity search.
#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    pub input: Option<String>,
}

/// Body of the car-return route: which booking is being closed out.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarReturn {
    pub booking_id: Uuid,
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateCar>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Owner])?;
    let car = state.cars.create(actor, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Car created successfully",
            "car": car,
        })),
    ))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let car = state.cars.get(user.into_inner(), id).await?;
    Ok(Json(car))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCar>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Owner])?;
    let car = state.cars.update(actor, id, req).await?;
    Ok(Json(json!({
        "message": "Car updated successfully. Waiting for admin approval.",
        "car": car,
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Owner, Role::Admin])?;
    state.cars.delete(actor, id).await?;
    Ok(Json(json!({ "message": "Car deleted successfully" })))
}

pub async fn approve(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Admin])?;
    let car = state.cars.approve(actor, id).await?;
    Ok(Json(car))
}

pub async fn list_available(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(location): Query<LocationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(latitude), Some(longitude)) = (location.latitude, location.longitude) else {
        return Err(ServiceError::Validation("user location is required".into()).into());
    };
    let cars = state.cars.list_available(latitude, longitude).await?;
    Ok(Json(cars))
}

pub async fn list_owner(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Admin, Role::Owner])?;
    let cars = state.cars.list_owner(actor).await?;
    Ok(Json(cars))
}

pub async fn admin_list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let cars = state.cars.list_all().await?;
    Ok(Json(cars))
}

/// Owner marks a rented car as returned: completes the reservation and
/// frees the car.
pub async fn car_return(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CarReturn>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Owner, Role::Admin])?;
    state
        .reservations
        .complete(actor, id, body.booking_id)
        .await?;
    Ok(Json(json!({
        "message": "Car status updated to available and reservation marked as completed",
    })))
}

pub async fn address_suggestions(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SuggestQuery>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(&[Role::Owner])?;
    let input = query.input.unwrap_or_default();
    let suggestions = state.cars.address_suggestions(&input).await?;
    Ok(Json(json!({ "suggestions": suggestions })))
}
