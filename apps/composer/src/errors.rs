use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::export::ExportError;
use crate::image::ImageError;
use crate::suggestion::SuggestionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Suggestion error: {0}")]
    Suggestion(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SuggestionError> for AppError {
    fn from(e: SuggestionError) -> Self {
        match e {
            SuggestionError::Busy(_) => AppError::Conflict(e.to_string()),
            SuggestionError::NotEligible(_) => AppError::Validation(e.to_string()),
            SuggestionError::UnknownControl(_) | SuggestionError::NoCandidate(_) => {
                AppError::NotFound(e.to_string())
            }
            SuggestionError::Service(_) => AppError::Suggestion(e.to_string()),
        }
    }
}

impl From<ImageError> for AppError {
    fn from(e: ImageError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<ExportError> for AppError {
    fn from(e: ExportError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Suggestion(msg) => {
                tracing::warn!("Suggestion error: {msg}");
                (StatusCode::BAD_GATEWAY, "SUGGESTION_FAILED", msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_maps_to_conflict() {
        let response = AppError::from(SuggestionError::Busy("summary".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_service_failure_maps_to_bad_gateway() {
        let response =
            AppError::from(SuggestionError::Service("timed out".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_image_error_is_validation() {
        let response = AppError::from(ImageError::Empty).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
