// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Fail-fast model loading: every unusable configuration is a StartupError
//! before any listener exists.

use std::fs;
use std::path::PathBuf;
use text_embedding_service::{
    config::{ConfigError, ServiceConfig},
    embeddings::{EmbeddingRuntime, StartupError},
};

fn config_for(model_path: PathBuf) -> ServiceConfig {
    ServiceConfig {
        model_path,
        inference_workers: 1,
        intra_threads: 1,
        ..ServiceConfig::default()
    }
}

#[tokio::test]
async fn test_missing_model_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let result = EmbeddingRuntime::load(&config_for(missing.clone())).await;

    match result {
        Err(StartupError::ModelNotFound(path)) => assert_eq!(path, missing),
        other => panic!("expected ModelNotFound, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_directory_without_model_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("tokenizer.json"), "{}").unwrap();

    let result = EmbeddingRuntime::load(&config_for(dir.path().to_path_buf())).await;

    assert!(matches!(result, Err(StartupError::ModelNotFound(_))));
}

#[tokio::test]
async fn test_missing_tokenizer_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("model.onnx"), b"not really onnx").unwrap();

    let result = EmbeddingRuntime::load(&config_for(dir.path().to_path_buf())).await;

    assert!(matches!(result, Err(StartupError::TokenizerNotFound(_))));
}

#[tokio::test]
async fn test_corrupt_artifacts_fail() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("model.onnx"), b"not really onnx").unwrap();
    fs::write(dir.path().join("tokenizer.json"), "{\"broken\": ").unwrap();

    let result = EmbeddingRuntime::load(&config_for(dir.path().to_path_buf())).await;

    let err = result.expect_err("corrupt artifacts must not load");
    assert!(matches!(err, StartupError::Tokenizer { .. }), "got {}", err);
    assert!(err.to_string().contains("tokenizer.json"));
}

#[tokio::test]
async fn test_invalid_config_rejected_before_loading() {
    let config = ServiceConfig {
        inference_workers: 0,
        ..config_for(PathBuf::from("/nonexistent"))
    };

    let result = EmbeddingRuntime::load(&config).await;

    match result {
        Err(StartupError::Config(ConfigError::Zero { field })) => {
            assert_eq!(field, "inference_workers")
        }
        other => panic!("expected config error, got {:?}", other.map(|_| ())),
    }
}
