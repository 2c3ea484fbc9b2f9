use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tally_core::{BillId, NewNotification};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::bills::BillService;
use crate::error::ServiceError;
use crate::ingest::IngestService;

/// Headroom over the largest accepted email body.
const MAX_REQUEST_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    pub bills: Arc<BillService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/notifications", post(ingest_notification))
        .route("/api/bills/{id}/pay", post(pay_bill))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "tally-server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn ingest_notification(
    State(state): State<AppState>,
    Json(input): Json<NewNotification>,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = state.ingest.ingest(input).await?;
    let status = if outcome.is_duplicate() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}

async fn pay_bill(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let paid = state.bills.mark_paid_now(BillId(id)).await?;
    Ok(Json(paid))
}
