use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::UserId,
    entities::{ack_production, cmr_delivery},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Default)]
pub struct SeasonQuery {
    pub season: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DumpingRequest {
    pub dumping_date: NaiveDate,
}

pub fn records_routes() -> Router<AppState> {
    Router::new()
        .route("/cmr/deliveries", get(list_cmr_deliveries))
        .route("/cmr/deliveries/:id/dumping", post(complete_dumping))
        .route("/acks", get(list_ack_productions))
}

pub async fn list_cmr_deliveries(
    State(state): State<AppState>,
    user: UserId,
    Query(query): Query<SeasonQuery>,
) -> ApiResult<Vec<cmr_delivery::Model>> {
    let deliveries = state
        .services
        .cmr_deliveries
        .list(user, query.season.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(deliveries)))
}

pub async fn complete_dumping(
    State(state): State<AppState>,
    user: UserId,
    Path(id): Path<Uuid>,
    Json(payload): Json<DumpingRequest>,
) -> ApiResult<cmr_delivery::Model> {
    let updated = state
        .services
        .cmr_deliveries
        .mark_dumping_completed(user, id, payload.dumping_date)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn list_ack_productions(
    State(state): State<AppState>,
    user: UserId,
    Query(query): Query<SeasonQuery>,
) -> ApiResult<Vec<ack_production::Model>> {
    let productions = state
        .services
        .ack_productions
        .list(user, query.season.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(productions)))
}
