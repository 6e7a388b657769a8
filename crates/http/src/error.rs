//! Error handling for the SHELF HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::{NoContext, Timestamp, Uuid};

/// Body of every error response: `{"error": "<message>"}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Application error kinds and the status each one maps to
#[derive(Error, Debug)]
pub enum AppError {
    /// Request could not be decoded (body or path). 400.
    #[error("bad request: {message}")]
    BadRequest { message: String, code: String },

    /// Request decoded but failed domain validation. 400.
    #[error("validation error: {message}")]
    Validation { message: String, code: String },

    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: "bad_request".to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: "validation_error".to_string(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v7(Timestamp::now(NoContext));
        let status = self.status();

        let (error_code, message) = match self {
            AppError::BadRequest { message, code }
            | AppError::Validation { message, code }
            | AppError::NotFound { message, code } => (code, message),
            AppError::Internal(e) => ("internal_error".to_string(), format!("{e:#}")),
        };

        if status.is_server_error() {
            tracing::error!(
                error_id = %error_id,
                error_code = %error_code,
                status_code = %status.as_u16(),
                error = %message,
                "request failed"
            );
        } else {
            tracing::warn!(
                error_id = %error_id,
                error_code = %error_code,
                status_code = %status.as_u16(),
                error = %message,
                "request rejected"
            );
        }

        // Internal details stay in the log for release builds
        let message = if cfg!(not(debug_assertions)) && status == StatusCode::INTERNAL_SERVER_ERROR
        {
            "An internal server error occurred".to_string()
        } else {
            message
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
