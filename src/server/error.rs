//! HTTP mapping for pipeline errors.
//!
//! Every failure leaves the service as `{"error": "<message>"}`. Validation
//! messages are shown as-is, transport errors show their classified text,
//! and anything internal is replaced by a generic line so paths and vendor
//! details stay in the logs.

use crate::error::{ExtractError, ValidationError};
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

const INTERNAL_MESSAGE: &str = "Internal server error while processing the document";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error type returned by the handlers.
#[derive(Debug)]
pub enum ApiError {
    Extract(ExtractError),
    /// The multipart body itself was unreadable or over the body limit.
    Multipart { status: StatusCode, message: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Extract(ExtractError::Validation(ValidationError::FileTooLarge { .. })) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::Extract(ExtractError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Extract(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Multipart { status, .. } => *status,
        }
    }

    /// Text shown to the client.
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Extract(e @ ExtractError::Validation(_))
            | ApiError::Extract(e @ ExtractError::Transport(_)) => e.to_string(),
            ApiError::Extract(_) => INTERNAL_MESSAGE.to_string(),
            ApiError::Multipart { message, .. } => message.clone(),
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        ApiError::Extract(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Extract(e.into())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        let status = e.status();
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "File is too large for upload".to_string()
        } else {
            format!("Failed to read multipart body: {}", e.body_text())
        };
        ApiError::Multipart { status, message }
    }
}

fn log_error(error: &ApiError) {
    match error {
        ApiError::Extract(e @ (ExtractError::Validation(_) | ExtractError::Transport(_))) => {
            tracing::debug!(error = %e, stage = e.stage(), "Request failed");
        }
        ApiError::Extract(e) => {
            tracing::error!(error = %e, stage = e.stage(), "Request failed");
        }
        ApiError::Multipart { status, message } => {
            tracing::debug!(status = %status, error = %message, "Rejected multipart body");
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log_error(&self);
        let body = Json(ErrorResponse {
            error: self.client_message(),
        });
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::path::PathBuf;

    #[test]
    fn validation_is_400() {
        let e = ApiError::from(ValidationError::UnsupportedMimeType {
            mime_type: "text/plain".into(),
        });
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert!(e.client_message().contains("text/plain"));
    }

    #[test]
    fn too_large_is_413() {
        let e = ApiError::from(ValidationError::FileTooLarge { size: 6, max: 5 });
        assert_eq!(e.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn transport_is_500_with_classified_text() {
        let e = ApiError::from(ExtractError::from(TransportError::Unauthorized {
            detail: "API key not valid".into(),
        }));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            e.client_message(),
            "AI service authentication failed. Check the API key configuration"
        );
    }

    #[test]
    fn io_is_hidden() {
        let e = ApiError::from(ExtractError::Io {
            path: PathBuf::from("/var/tmp/idextract-uploads/upload-x1"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        });
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!e.client_message().contains("/var/tmp"));
    }
}
