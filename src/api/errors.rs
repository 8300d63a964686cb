// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;
use tracing::error;

use crate::embeddings::EmbedError;

/// Message returned for any server-side inference failure. Details go to the log only.
pub const INFERENCE_FAILED_MESSAGE: &str = "Embedding generation failed";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

/// Every failure a handler can answer with. Only `InternalError` hides its
/// cause; the rest are safe to show to clients.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Validation error for {field}: {message}")]
    ValidationError { field: String, message: String },

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Model '{model}' not found")]
    ModelNotFound {
        model: String,
        available_models: Vec<String>,
    },

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Request timed out")]
    Timeout,
}

impl ApiError {
    /// Stable machine-readable tag carried in `ErrorResponse::error_type`
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::ValidationError { .. } => "validation_error",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::ModelNotFound { .. } => "model_not_found",
            ApiError::InternalError(_) => "internal_error",
            ApiError::Timeout => "timeout",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let (message, details) = match self {
            ApiError::NotFound(msg)
            | ApiError::InvalidRequest(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::InternalError(msg) => (msg.clone(), None),
            ApiError::ValidationError { field, message } => (
                message.clone(),
                Some(HashMap::from([("field".to_string(), json!(field))])),
            ),
            ApiError::ModelNotFound {
                available_models, ..
            } => (
                self.to_string(),
                Some(HashMap::from([(
                    "available_models".to_string(),
                    json!(available_models),
                )])),
            ),
            ApiError::Timeout => (self.to_string(), None),
        };

        ErrorResponse {
            error_type: self.error_type().to_string(),
            message,
            details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) | ApiError::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Converts a runtime failure into a generic 500, logging the cause.
    pub fn inference_failed(err: EmbedError) -> Self {
        error!(error = %err, "embedding inference failed");
        ApiError::InternalError(INFERENCE_FAILED_MESSAGE.to_string())
    }
}

/// Malformed bodies become structured client errors instead of axum's
/// plain-text 422.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::InvalidRequest(rejection.body_text())
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::InvalidRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}
