// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedResponse type for POST /embed

use crate::embeddings::Embedding;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Response body for POST /embed
///
/// `embeddings[i]` belongs to input `i`.
///
/// # Example
/// ```json
/// {
///   "embeddings": [[0.01, -0.04, ...], [0.02, 0.11, ...]],
///   "count": 2,
///   "dimension": 384,
///   "model": "sentence-transformers/all-MiniLM-L6-v2",
///   "total_tokens": 9,
///   "processing_time_ms": 4.21
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<Vec<f32>>,

    pub count: usize,

    pub dimension: usize,

    pub model: String,

    /// Tokens fed to the model across all inputs
    pub total_tokens: usize,

    /// Indices of inputs cut at the max sequence length
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub truncated: Vec<usize>,

    pub processing_time_ms: f64,
}

impl EmbedResponse {
    pub fn from_embeddings(
        model: impl Into<String>,
        dimension: usize,
        embeddings: Vec<Embedding>,
        elapsed: Duration,
    ) -> Self {
        let total_tokens = embeddings.iter().map(|e| e.token_count).sum();
        let truncated = embeddings
            .iter()
            .enumerate()
            .filter(|(_, e)| e.truncated)
            .map(|(i, _)| i)
            .collect();
        let vectors: Vec<Vec<f32>> = embeddings.into_iter().map(|e| e.vector).collect();

        Self {
            count: vectors.len(),
            embeddings: vectors,
            dimension,
            model: model.into(),
            total_tokens,
            truncated,
            processing_time_ms: (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0,
        }
    }

}
