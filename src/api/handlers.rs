// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::extract::State;
use axum::http::Uri;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::http_server::AppState;
use super::ApiError;
use crate::config::TruncationPolicy;
use crate::embeddings::{DEFAULT_MODEL_NAME, EMBEDDING_DIMENSION, MAX_SEQUENCE_LENGTH};
use crate::version;

pub const STATUS_OK: &str = "ok";
pub const STATUS_NOT_READY: &str = "not_ready";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" once the model is loaded, "not_ready" before
    pub status: String,
    pub model_loaded: bool,
    pub model_name: String,
    pub embedding_dimension: usize,
    pub max_sequence_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub model_name: String,
    pub model_type: String,
    pub embedding_dimension: usize,
    pub max_sequence_length: usize,
    pub pooling: String,
    pub normalization: String,
    pub truncation_policy: TruncationPolicy,
    pub inference_workers: usize,
    pub max_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfoResponse {
    pub service: String,
    pub version: String,
    pub model: String,
    pub description: String,
    pub features: Vec<String>,
    pub endpoints: Vec<String>,
}

/// GET /health
///
/// Always 200 while the process is accepting connections; `status` reflects
/// whether the model handle has been published.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let response = match state.runtime() {
        Ok(runtime) => HealthResponse {
            status: STATUS_OK.to_string(),
            model_loaded: true,
            model_name: runtime.model_name().to_string(),
            embedding_dimension: runtime.dimension(),
            max_sequence_length: runtime.max_sequence_length(),
        },
        Err(_) => HealthResponse {
            status: STATUS_NOT_READY.to_string(),
            model_loaded: false,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            embedding_dimension: EMBEDDING_DIMENSION,
            max_sequence_length: MAX_SEQUENCE_LENGTH,
        },
    };
    Json(response)
}

/// GET /api/v1/model-info
pub async fn model_info_handler(
    State(state): State<AppState>,
) -> Result<Json<ModelInfoResponse>, ApiError> {
    let runtime = state.runtime()?;
    let limits = state.limits();

    Ok(Json(ModelInfoResponse {
        model_name: runtime.model_name().to_string(),
        model_type: "Sentence Transformer".to_string(),
        embedding_dimension: runtime.dimension(),
        max_sequence_length: runtime.max_sequence_length(),
        pooling: "mean".to_string(),
        normalization: "L2 (on by default, disable with \"normalize\": false)".to_string(),
        truncation_policy: limits.truncation_policy,
        inference_workers: runtime.workers(),
        max_batch_size: limits.max_batch_size,
    }))
}

/// GET /
pub async fn root_handler() -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        service: "Text Embedding Service".to_string(),
        version: version::VERSION_NUMBER.to_string(),
        model: DEFAULT_MODEL_NAME.to_string(),
        description: format!(
            "Convert text to {}-dimensional semantic vectors",
            EMBEDDING_DIMENSION
        ),
        features: version::FEATURES.iter().map(|f| f.to_string()).collect(),
        endpoints: vec![
            "GET /health".to_string(),
            "POST /embed".to_string(),
            "POST /api/v1/embed".to_string(),
            "GET /api/v1/model-info".to_string(),
            "POST /api/v1/similarity".to_string(),
        ],
    })
}

pub async fn not_found_handler(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}
