use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{
    auth::UserId,
    errors::ServiceError,
    services::cmr_integration::{
        BulkImportSummary, CmrImportRecord, ImportOptions, ImportOutcome, IntegratedAckData,
    },
    ApiResponse, ApiResult, AppState,
};

/// Largest batch accepted by the bulk endpoint. At the default 50 ms pacing
/// this is 25 s of pauses, inside the router's 60 s request timeout.
pub const MAX_BULK_RECORDS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub record: CmrImportRecord,
    #[serde(default)]
    pub options: ImportOptions,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkImportRequest {
    #[validate(length(min = 1, max = 500))]
    pub records: Vec<CmrImportRecord>,
    #[serde(default)]
    #[validate]
    pub options: ImportOptions,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FreightSyncResponse {
    pub ack_number: String,
    pub synced: bool,
}

pub fn integration_routes() -> Router<AppState> {
    Router::new()
        .route("/cmr/imports", post(import_cmr_delivery))
        .route("/cmr/imports/bulk", post(bulk_import))
        .route("/acks/:ack_number", get(get_integrated_ack))
        .route("/acks/:ack_number/freight-sync", post(sync_freight))
}

/// Imports one CMR row. Skips and failures are reported in the body, not as
/// HTTP errors.
pub async fn import_cmr_delivery(
    State(state): State<AppState>,
    user: UserId,
    Json(payload): Json<ImportRequest>,
) -> ApiResult<ImportOutcome> {
    let outcome = state
        .services
        .integration
        .import_cmr_delivery(user, &payload.record, &payload.options)
        .await;

    Ok(Json(ApiResponse::success(outcome)))
}

pub async fn bulk_import(
    State(state): State<AppState>,
    user: UserId,
    Json(payload): Json<BulkImportRequest>,
) -> ApiResult<BulkImportSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let summary = state
        .services
        .integration
        .bulk_import_with_progress(user, &payload.records, &payload.options, |progress| {
            info!(
                current = progress.current,
                total = progress.total,
                ack_number = %progress.ack_number,
                "Importing CMR record"
            );
        })
        .await;

    Ok(Json(ApiResponse::success(summary)))
}

pub async fn sync_freight(
    State(state): State<AppState>,
    user: UserId,
    Path(ack_number): Path<String>,
) -> ApiResult<FreightSyncResponse> {
    let synced = state
        .services
        .integration
        .sync_ack_production_to_freight(user, &ack_number)
        .await;

    Ok(Json(ApiResponse::success(FreightSyncResponse {
        ack_number,
        synced,
    })))
}

pub async fn get_integrated_ack(
    State(state): State<AppState>,
    user: UserId,
    Path(ack_number): Path<String>,
) -> ApiResult<IntegratedAckData> {
    let data = state
        .services
        .integration
        .integrated_ack_data(user, &ack_number)
        .await;

    Ok(Json(ApiResponse::success(data)))
}
