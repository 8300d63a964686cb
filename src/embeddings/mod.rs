// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model Runtime
//!
//! Owns the sentence-embedding model and turns text into 384-dimensional
//! vectors. The model is loaded once at startup and shared read-only by
//! every request through [`EmbeddingRuntime`].

pub mod error;
pub mod hashed;
pub mod onnx_model;
pub mod pooling;
pub mod runtime;

pub use error::{EmbedError, StartupError};
pub use hashed::HashedEmbeddingModel;
pub use onnx_model::{ModelArtifacts, OnnxEmbeddingModel, OnnxModelOptions};
pub use runtime::EmbeddingRuntime;

/// Output width of all-MiniLM-L6-v2
pub const EMBEDDING_DIMENSION: usize = 384;

/// Tokens kept per input; longer inputs are truncated by the tokenizer
pub const MAX_SEQUENCE_LENGTH: usize = 256;

/// Name reported for the bundled sentence transformer
pub const DEFAULT_MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// A single embedded text.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// Sentence vector, always `dimension()` wide
    pub vector: Vec<f32>,
    /// Tokens fed to the model (after truncation, including special tokens)
    pub token_count: usize,
    /// Whether the input was cut at the max sequence length
    pub truncated: bool,
}

/// Anything that can turn a batch of texts into sentence vectors.
///
/// Implementations are blocking and CPU-bound. Callers are expected to run
/// them off the async executor; [`EmbeddingRuntime`] does this on a bounded
/// pool of blocking workers.
pub trait TextEmbedder: Send + Sync {
    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;

    fn max_sequence_length(&self) -> usize;

    /// Embeds `texts` in order, one [`Embedding`] per input.
    ///
    /// Results for a text must not depend on what else is in the batch.
    fn embed_batch(&self, texts: &[String], normalize: bool) -> anyhow::Result<Vec<Embedding>>;

    /// Number of tokens `text` produces before truncation.
    fn count_tokens(&self, text: &str) -> anyhow::Result<usize>;
}
