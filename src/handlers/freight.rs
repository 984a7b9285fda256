use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    auth::UserId, entities::lorry_freight, errors::ServiceError,
    handlers::records::SeasonQuery, ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    #[validate(custom = "validate_positive_amount")]
    pub amount: Decimal,
}

fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        let mut err = ValidationError::new("amount");
        err.message = Some("amount must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

pub fn freight_routes() -> Router<AppState> {
    Router::new()
        .route("/freight", get(list_freight))
        .route("/freight/:id/payments", post(record_payment))
}

pub async fn list_freight(
    State(state): State<AppState>,
    user: UserId,
    Query(query): Query<SeasonQuery>,
) -> ApiResult<Vec<lorry_freight::Model>> {
    let entries = state
        .services
        .lorry_freight
        .list(user, query.season.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(entries)))
}

pub async fn record_payment(
    State(state): State<AppState>,
    user: UserId,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> ApiResult<lorry_freight::Model> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let updated = state
        .services
        .lorry_freight
        .record_payment(user, id, payload.amount)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}
