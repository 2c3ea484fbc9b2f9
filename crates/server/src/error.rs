use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use tally_core::BillId;
use tally_reconcile::ReconcileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("No user is registered for sender '{0}'")]
    UnknownSender(String),
    #[error("Bill {0} not found")]
    BillNotFound(BillId),
    #[error("Bill cannot be marked as paid before the due date: {due}")]
    NotYetDue { due: NaiveDate },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ReconcileError> for ServiceError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::NotYetDue { due } => ServiceError::NotYetDue { due },
        }
    }
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::UnknownSender(_) => StatusCode::FORBIDDEN,
            ServiceError::BillNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::NotYetDue { .. } => StatusCode::CONFLICT,
            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            due: Option<NaiveDate>,
        }

        let status = self.status();
        let body = match &self {
            ServiceError::Database(e) => {
                tracing::error!(error = %e, "Database failure");
                ErrorResponse {
                    error: "Internal server error".to_string(),
                    due: None,
                }
            }
            ServiceError::NotYetDue { due } => ErrorResponse {
                error: self.to_string(),
                due: Some(*due),
            },
            other => ErrorResponse {
                error: other.to_string(),
                due: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
