#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use ricemill_procurement::{
    auth::{UserId, USER_ID_HEADER},
    config::{AppConfig, IntegrationConfig},
    db::{self, DbConfig},
    events::{self, EventSender},
    services::cmr_integration::CmrImportRecord,
    AppState,
};
use rust_decimal_macros::dec;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Application state and router over a fresh in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub user: UserId,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // No pacing between bulk items in tests.
        cfg.integration = IntegrationConfig {
            bulk_item_delay_ms: 0,
            ..Default::default()
        };

        let pool = db::establish_connection_with_config(&DbConfig::sqlite_in_memory())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), &cfg, EventSender::new(event_tx));
        let router = ricemill_procurement::build_router(state.clone());

        Self {
            router,
            state,
            user: UserId::new(Uuid::new_v4()),
            _event_task: event_task,
        }
    }

    /// Sends a request, attaching `user` as the caller identity when given.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        user: Option<UserId>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user.to_string());
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request as the harness's default user.
    pub async fn request_as_user(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.user)).await
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}

pub fn dispatch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, 5).expect("valid date")
}

pub fn cmr_record(ack_number: &str) -> CmrImportRecord {
    CmrImportRecord {
        ack_number: ack_number.to_string(),
        dispatch_date: dispatch_date(),
        vehicle_number: "TN 45 AB 1234".to_string(),
        net_rice_qty: dec!(200),
        frk_qty: dec!(10),
        gate_in_date: None,
        dumping_date: None,
    }
}
