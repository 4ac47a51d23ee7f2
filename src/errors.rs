use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::BookingStatus;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("booking conflict detected for resource {resource_id}")]
    Conflict { resource_id: String },

    #[error("provider {provider_id} is not available during the requested time period")]
    Unavailable { provider_id: String },

    #[error("cannot accept a booking that is not in PENDING status, current status: {status}")]
    InvalidState { status: BookingStatus },

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(id: &str) -> Self {
        AppError::NotFound(format!("booking with ID {id} not found"))
    }

    /// Stable tag carried in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict { .. } => "conflict",
            AppError::Unavailable { .. } => "unavailable",
            AppError::InvalidState { .. } => "invalid_state",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Storage(_) => "storage",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Unavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidState { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AppError::Storage(e) = &self {
            tracing::error!(error = %e, "storage failure");
        }

        let body = serde_json::json!({ "error": self.to_string(), "kind": self.kind() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::not_found("b1").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Conflict { resource_id: "r1".into() }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Unavailable { provider_id: "u2".into() }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::InvalidState { status: BookingStatus::Confirmed }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Storage(anyhow::anyhow!("disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_name_the_subject() {
        let err = AppError::Conflict { resource_id: "r1".into() };
        assert!(err.to_string().contains("r1"));

        let err = AppError::InvalidState { status: BookingStatus::Rejected };
        assert!(err.to_string().contains("REJECTED"));
    }
}
