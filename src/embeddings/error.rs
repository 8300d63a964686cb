// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Fatal errors raised while bringing the model up. The process must not
/// serve traffic after any of these.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("model artifacts not found at {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("tokenizer not found at {}", .0.display())]
    TokenizerNotFound(PathBuf),

    #[error("failed to load tokenizer from {}: {reason}", .path.display())]
    Tokenizer { path: PathBuf, reason: String },

    #[error("failed to load ONNX model from {}: {reason}", .path.display())]
    Session { path: PathBuf, reason: String },

    #[error("model failed validation: {0}")]
    InvalidModel(String),

    #[error("model loading task failed: {0}")]
    Join(String),
}

/// Per-request inference failures. Never fatal to the process.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("no texts to embed")]
    EmptyInput,

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("inference worker failed: {0}")]
    Worker(String),

    #[error("inference worker pool is closed")]
    PoolClosed,

    #[error("model returned {actual} embeddings for {expected} texts")]
    CountMismatch { expected: usize, actual: usize },

    #[error("embedding {index} has {actual} dimensions (expected {expected})")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
}
