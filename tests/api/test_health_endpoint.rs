// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /health, GET /api/v1/model-info and GET / against ready and
//! not-ready states.

use super::common::{get_json, hashed_app, not_ready_app};
use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use text_embedding_service::{
    api::{create_app, AppState},
    config::RequestLimits,
    embeddings::{EmbeddingRuntime, HashedEmbeddingModel, EMBEDDING_DIMENSION},
    version,
};

fn hashed_runtime() -> EmbeddingRuntime {
    EmbeddingRuntime::new(Arc::new(HashedEmbeddingModel::default()), 1)
}

#[tokio::test]
async fn test_health_when_ready() {
    let (status, body) = get_json(&hashed_app(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model_name"], "hashed-minilm");
    assert_eq!(body["embedding_dimension"], EMBEDDING_DIMENSION);
    assert_eq!(body["max_sequence_length"], 256);
}

#[tokio::test]
async fn test_health_before_model_loaded() {
    let (status, body) = get_json(&not_ready_app(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["model_loaded"], false);
}

#[tokio::test]
async fn test_readiness_flips_once_runtime_published() {
    let state = AppState::new(RequestLimits::default());
    let app = create_app(state.clone());

    let (_, body) = get_json(&app, "/health").await;
    assert_eq!(body["status"], "not_ready");

    assert!(state.set_runtime(hashed_runtime()).is_ok());
    let (_, body) = get_json(&app, "/health").await;
    assert_eq!(body["status"], "ok");

    // the handle is published exactly once
    assert!(state.set_runtime(hashed_runtime()).is_err());
    assert!(state.is_ready());
}

#[tokio::test]
async fn test_model_info() {
    let (status, body) = get_json(&hashed_app(), "/api/v1/model-info").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_name"], "hashed-minilm");
    assert_eq!(body["embedding_dimension"], EMBEDDING_DIMENSION);
    assert_eq!(body["pooling"], "mean");
    assert_eq!(body["truncation_policy"], "truncate");
    assert_eq!(body["inference_workers"], 2);
    assert_eq!(body["max_batch_size"], 100);
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (status, body) = get_json(&not_ready_app(), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], version::VERSION_NUMBER);
    let endpoints = body["endpoints"].as_array().unwrap();
    assert!(endpoints.contains(&json!("POST /embed")));
    assert!(endpoints.contains(&json!("GET /health")));
    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), version::FEATURES.len());
    assert!(features.contains(&json!("batch-embedding")));
}
