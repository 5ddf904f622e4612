//! Review routes.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use model::{ReviewTarget, Role};
use serde::Deserialize;
use serde_json::json;
use service::CreateReview;
use uuid::Uuid;

use crate::{AppState, error::ApiError, extract::CurrentUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetQuery {
    pub reviewed_entity: Uuid,
    #[serde(rename = "type")]
    pub target: ReviewTarget,
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateReview>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Owner, Role::Customer])?;
    let review = state.reviews.add(actor, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Review added successfully",
            "review": review,
        })),
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Admin, Role::Customer, Role::Owner])?;
    state.reviews.delete(actor, id).await?;
    Ok(Json(json!({ "message": "Review deleted successfully" })))
}

pub async fn list_for_target(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<TargetQuery>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let reviews = state
        .reviews
        .list_for_target(query.target, query.reviewed_entity)
        .await?;
    Ok(Json(reviews))
}

pub async fn own_reviews(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.require_role(&[Role::Customer, Role::Owner])?;
    let reviews = state.reviews.own_reviews(actor).await?;
    Ok(Json(reviews))
}

pub async fn admin_list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let reviews = state.reviews.list_all().await?;
    Ok(Json(reviews))
}

pub async fn car_reviews(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(&[Role::Customer])?;
    let reviews = state.reviews.car_reviews(id).await?;
    Ok(Json(reviews))
}
