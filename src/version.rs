// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the text embedding service

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-minilm-embeddings-2025-10-17";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Build date
pub const BUILD_DATE: &str = "2025-10-17";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "minilm-l6-v2",
    "batch-embedding",
    "mean-pooling",
    "l2-normalization",
    "cosine-similarity",
    "bounded-inference-workers",
    "request-timeouts",
    "graceful-shutdown",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Text Embedding Service {} ({})", VERSION_NUMBER, BUILD_DATE)
}
