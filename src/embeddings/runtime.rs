// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared model handle and bounded inference pool.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::{
    EmbedError, Embedding, ModelArtifacts, OnnxEmbeddingModel, OnnxModelOptions, StartupError,
    TextEmbedder, DEFAULT_MODEL_NAME, MAX_SEQUENCE_LENGTH,
};
use crate::config::ServiceConfig;

/// The process-wide model handle.
///
/// Immutable after construction and cheap to clone. Inference runs on tokio's
/// blocking pool, at most `workers` batches at a time, so CPU-bound work never
/// stalls the request-handling threads.
#[derive(Clone)]
pub struct EmbeddingRuntime {
    model: Arc<dyn TextEmbedder>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl std::fmt::Debug for EmbeddingRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingRuntime")
            .field("model_name", &self.model.model_name())
            .field("dimension", &self.model.dimension())
            .field("workers", &self.workers)
            .finish()
    }
}

impl EmbeddingRuntime {
    pub fn new(model: Arc<dyn TextEmbedder>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            model,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Loads the ONNX model named by `config` and wraps it in a runtime.
    ///
    /// Fails fast: any missing or unusable artifact is a [`StartupError`].
    pub async fn load(config: &ServiceConfig) -> Result<Self, StartupError> {
        config.validate()?;

        let location = config.model_path.clone();
        let options = OnnxModelOptions {
            sessions: config.inference_workers,
            intra_threads: config.intra_threads,
            max_length: MAX_SEQUENCE_LENGTH,
        };

        info!(model_path = %location.display(), "📦 Loading embedding model");
        let started = Instant::now();

        let model = tokio::task::spawn_blocking(move || {
            let artifacts = ModelArtifacts::resolve(&location)?;
            OnnxEmbeddingModel::load(DEFAULT_MODEL_NAME, &artifacts, &options)
        })
        .await
        .map_err(|e| StartupError::Join(e.to_string()))??;

        info!(
            model = %model.model_name(),
            dimension = model.dimension(),
            max_sequence_length = model.max_sequence_length(),
            load_ms = started.elapsed().as_millis() as u64,
            "✓ Model loaded"
        );

        Ok(Self::new(Arc::new(model), config.inference_workers))
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    pub fn max_sequence_length(&self) -> usize {
        self.model.max_sequence_length()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Workers not currently running a batch.
    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Embeds `texts` in order on the blocking pool.
    ///
    /// Dropping the returned future abandons the result but not the work: the
    /// worker permit travels with the blocking task and is released only when
    /// the model call returns.
    pub async fn embed(
        &self,
        texts: Vec<String>,
        normalize: bool,
    ) -> Result<Vec<Embedding>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let expected = texts.len();
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EmbedError::PoolClosed)?;
        let model = Arc::clone(&self.model);

        let embeddings = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            model.embed_batch(&texts, normalize)
        })
        .await
        .map_err(|e| EmbedError::Worker(e.to_string()))?
        .map_err(|e| EmbedError::Inference(format!("{:#}", e)))?;

        if embeddings.len() != expected {
            return Err(EmbedError::CountMismatch {
                expected,
                actual: embeddings.len(),
            });
        }

        let dimension = self.dimension();
        if let Some((index, bad)) = embeddings
            .iter()
            .enumerate()
            .find(|(_, e)| e.vector.len() != dimension)
        {
            return Err(EmbedError::DimensionMismatch {
                index,
                expected: dimension,
                actual: bad.vector.len(),
            });
        }

        Ok(embeddings)
    }

    /// Indices of `texts` longer than the max sequence length.
    ///
    /// Tokenizes on the blocking pool under an inference worker permit, so
    /// length checks count against the same bound as inference.
    pub async fn over_length(&self, texts: Vec<String>) -> Result<Vec<usize>, EmbedError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EmbedError::PoolClosed)?;
        let model = Arc::clone(&self.model);
        let max_length = self.max_sequence_length();

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let mut over = Vec::new();
            for (index, text) in texts.iter().enumerate() {
                let tokens = model
                    .count_tokens(text)
                    .map_err(|e| EmbedError::Inference(format!("{:#}", e)))?;
                if tokens > max_length {
                    warn!(index, tokens, max_length, "text exceeds max sequence length");
                    over.push(index);
                }
            }
            Ok::<_, EmbedError>(over)
        })
        .await
        .map_err(|e| EmbedError::Worker(e.to_string()))?
    }
}
