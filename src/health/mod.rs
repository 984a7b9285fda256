/*!
 * # Health Check Module
 *
 * - Basic health check (`/health`) - database ping plus uptime
 * - Liveness check (`/health/live`) - process is serving requests
 * - Metrics (`/metrics`) - Prometheus text exposition
 */

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use crate::{errors::ServiceError, metrics};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
}

#[derive(Clone)]
pub struct HealthState {
    pub db_pool: Arc<DatabaseConnection>,
    pub start_time: Instant,
}

impl HealthState {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self {
            db_pool,
            start_time: Instant::now(),
        }
    }
}

pub fn health_routes(db_pool: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
        .route("/metrics", get(metrics_endpoint))
        .with_state(HealthState::new(db_pool))
}

async fn health_check(State(state): State<HealthState>) -> impl IntoResponse {
    let database = match crate::db::check_connection(&state.db_pool).await {
        Ok(()) => HealthStatus::Up,
        Err(e) => {
            error!("Health check database ping failed: {}", e);
            HealthStatus::Down
        }
    };

    let code = if database == HealthStatus::Up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let info = HealthInfo {
        status: database.clone(),
        database,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };

    (code, Json(info))
}

async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, "alive")
}

async fn metrics_endpoint() -> Result<impl IntoResponse, ServiceError> {
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render()?,
    ))
}
