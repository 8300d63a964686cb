// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Embedding Model Wrapper
//!
//! Runs the all-MiniLM-L6-v2 sentence transformer through ONNX Runtime.
//!
//! Features:
//! - Model artifact discovery (`model.onnx` + `tokenizer.json`)
//! - BERT tokenization with truncation to the max sequence length
//! - Single and batch embedding generation with dynamic padding
//! - Attention-masked mean pooling and optional L2 normalization
//! - One ONNX session per inference worker

use anyhow::{anyhow, Context, Result};
use ndarray::{Array2, Axis, Ix2, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, TryLockError};
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::{debug, info};

use super::pooling::{l2_normalize, mean_pool};
use super::{Embedding, StartupError, TextEmbedder, EMBEDDING_DIMENSION, MAX_SEQUENCE_LENGTH};

const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// On-disk files that make up a sentence-transformer export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifacts {
    pub model_file: PathBuf,
    pub tokenizer_file: PathBuf,
}

impl ModelArtifacts {
    /// Resolves the configured model location.
    ///
    /// `location` may be a directory holding `model.onnx` (directly or under
    /// `onnx/`) and `tokenizer.json`, or the path of the `.onnx` file itself,
    /// in which case the tokenizer is looked up next to it or one level up.
    pub fn resolve(location: &Path) -> Result<Self, StartupError> {
        let (model_file, search_dirs) = if location.is_dir() {
            let candidates = [
                location.join(MODEL_FILE),
                location.join("onnx").join(MODEL_FILE),
            ];
            let model_file = candidates
                .into_iter()
                .find(|p| p.is_file())
                .ok_or_else(|| StartupError::ModelNotFound(location.join(MODEL_FILE)))?;
            (model_file, vec![location.to_path_buf()])
        } else if location.is_file() && location.extension().is_some_and(|ext| ext == "onnx") {
            let mut dirs = Vec::new();
            if let Some(parent) = location.parent() {
                dirs.push(parent.to_path_buf());
                if let Some(grandparent) = parent.parent() {
                    dirs.push(grandparent.to_path_buf());
                }
            }
            (location.to_path_buf(), dirs)
        } else {
            return Err(StartupError::ModelNotFound(location.to_path_buf()));
        };

        let tokenizer_file = search_dirs
            .iter()
            .map(|dir| dir.join(TOKENIZER_FILE))
            .find(|p| p.is_file())
            .ok_or_else(|| {
                let expected = search_dirs
                    .first()
                    .map(|dir| dir.join(TOKENIZER_FILE))
                    .unwrap_or_else(|| PathBuf::from(TOKENIZER_FILE));
                StartupError::TokenizerNotFound(expected)
            })?;

        Ok(Self {
            model_file,
            tokenizer_file,
        })
    }
}

/// Tuning knobs for [`OnnxEmbeddingModel::load`].
#[derive(Debug, Clone)]
pub struct OnnxModelOptions {
    /// Independent ONNX sessions; one per inference worker
    pub sessions: usize,
    /// Intra-op threads per session
    pub intra_threads: usize,
    /// Truncation length in tokens
    pub max_length: usize,
}

impl Default for OnnxModelOptions {
    fn default() -> Self {
        Self {
            sessions: 2,
            intra_threads: 4,
            max_length: MAX_SEQUENCE_LENGTH,
        }
    }
}

/// ONNX-based embedding model (all-MiniLM-L6-v2)
///
/// # Model Details
/// - Input: text, truncated to 256 tokens
/// - Output: 384-dimensional f32 vectors
/// - Pooling: mean over non-padding tokens
/// - Provider: CPU (ONNX Runtime)
///
/// # Thread Safety
/// Running an ONNX session needs exclusive access, so the model keeps a small
/// pool of sessions, each behind its own mutex. Callers pick any free one.
pub struct OnnxEmbeddingModel {
    sessions: Vec<Mutex<Session>>,

    /// Truncating tokenizer used for inference
    tokenizer: Tokenizer,

    /// Same vocabulary without truncation, for length checks
    counting_tokenizer: Tokenizer,

    model_name: String,
    dimension: usize,
    max_length: usize,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("max_length", &self.max_length)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Loads the model and tokenizer and validates the output width with a
    /// probe inference.
    ///
    /// Blocking; call from a blocking context.
    ///
    /// # Errors
    /// - tokenizer file unreadable or invalid
    /// - ONNX Runtime fails to build a session
    /// - model does not produce 384-dimensional embeddings
    pub fn load(
        model_name: impl Into<String>,
        artifacts: &ModelArtifacts,
        options: &OnnxModelOptions,
    ) -> Result<Self, StartupError> {
        let model_name = model_name.into();
        let session_count = options.sessions.max(1);

        info!(
            model = %model_name,
            model_file = %artifacts.model_file.display(),
            sessions = session_count,
            intra_threads = options.intra_threads,
            "🚀 Initializing ONNX embedding model"
        );

        let tokenizer = load_tokenizer(&artifacts.tokenizer_file, Some(options.max_length))?;
        let counting_tokenizer = load_tokenizer(&artifacts.tokenizer_file, None)?;

        let sessions = (0..session_count)
            .map(|_| build_session(&artifacts.model_file, options.intra_threads).map(Mutex::new))
            .collect::<Result<Vec<_>, _>>()?;

        let model = Self {
            sessions,
            tokenizer,
            counting_tokenizer,
            model_name,
            dimension: EMBEDDING_DIMENSION,
            max_length: options.max_length,
        };

        // Probe run: catches exports with the wrong hidden size before traffic
        let probe = model
            .embed_batch(&["validation test".to_string()], false)
            .map_err(|e| StartupError::InvalidModel(format!("{:#}", e)))?;
        if probe.len() != 1 || probe[0].vector.len() != EMBEDDING_DIMENSION {
            return Err(StartupError::InvalidModel(format!(
                "expected one {}-dimensional vector from probe inference",
                EMBEDDING_DIMENSION
            )));
        }

        info!(model = %model.model_name, "✅ ONNX embedding model loaded successfully");
        Ok(model)
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> Result<R>) -> Result<R> {
        for slot in &self.sessions {
            match slot.try_lock() {
                Ok(mut guard) => return f(&mut *guard),
                // A panicked run leaves no partial state in the session itself
                Err(TryLockError::Poisoned(poisoned)) => return f(&mut *poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => continue,
            }
        }

        let slot = self
            .sessions
            .first()
            .ok_or_else(|| anyhow!("no ONNX sessions available"))?;
        let mut guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *guard)
    }

    /// Runs one padded batch and returns pooled, unnormalized sentence vectors.
    fn run_batch(&self, session: &mut Session, encodings: &[Encoding]) -> Result<Vec<Vec<f32>>> {
        let batch_size = encodings.len();
        let max_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask = Vec::with_capacity(batch_size * max_len);
        let mut token_type_ids = Vec::with_capacity(batch_size * max_len);

        for encoding in encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let padding_needed = max_len - ids.len();

            input_ids.extend(ids.iter().map(|&id| id as i64));
            attention_mask.extend(mask.iter().map(|&m| m as i64));
            token_type_ids.extend(std::iter::repeat(0i64).take(ids.len()));

            input_ids.extend(std::iter::repeat(0i64).take(padding_needed));
            attention_mask.extend(std::iter::repeat(0i64).take(padding_needed));
            token_type_ids.extend(std::iter::repeat(0i64).take(padding_needed));
        }

        let mask_for_pooling = attention_mask.clone();

        let input_ids_array = Array2::from_shape_vec((batch_size, max_len), input_ids)
            .context("Failed to create input_ids array")?;
        let attention_mask_array = Array2::from_shape_vec((batch_size, max_len), attention_mask)
            .context("Failed to create attention_mask array")?;
        let token_type_ids_array = Array2::from_shape_vec((batch_size, max_len), token_type_ids)
            .context("Failed to create token_type_ids array")?;

        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?,
            "token_type_ids" => Value::from_array(token_type_ids_array)?
        ])?;

        // Output names differ between exports, so go by position
        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let mut pooled = Vec::with_capacity(batch_size);
        match output.ndim() {
            // Token embeddings: [batch, seq_len, hidden_dim]
            3 => {
                let output = output.into_dimensionality::<Ix3>()?;
                for idx in 0..batch_size {
                    let item = output.index_axis(Axis(0), idx);
                    let mask = &mask_for_pooling[idx * max_len..(idx + 1) * max_len];
                    pooled.push(mean_pool(item, mask));
                }
            }
            // Already pooled sentence embeddings: [batch, hidden_dim]
            2 => {
                let output = output.into_dimensionality::<Ix2>()?;
                for row in output.outer_iter() {
                    pooled.push(row.to_vec());
                }
            }
            _ => anyhow::bail!(
                "Model outputs unexpected dimensions: {:?} (expected [batch, seq_len, {}])",
                output.shape(),
                self.dimension
            ),
        }

        for (i, vector) in pooled.iter().enumerate() {
            if vector.len() != self.dimension {
                anyhow::bail!(
                    "Unexpected embedding dimension at index {}: {} (expected {})",
                    i,
                    vector.len(),
                    self.dimension
                );
            }
        }

        Ok(pooled)
    }
}

impl TextEmbedder for OnnxEmbeddingModel {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_sequence_length(&self) -> usize {
        self.max_length
    }

    fn embed_batch(&self, texts: &[String], normalize: bool) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let vectors = self.with_session(|session| self.run_batch(session, &encodings))?;
        debug!(batch_size = texts.len(), "ONNX batch inference complete");

        Ok(vectors
            .into_iter()
            .zip(&encodings)
            .map(|(mut vector, encoding)| {
                if normalize {
                    l2_normalize(&mut vector);
                }
                Embedding {
                    vector,
                    token_count: encoding.get_ids().len(),
                    truncated: !encoding.get_overflowing().is_empty(),
                }
            })
            .collect())
    }

    fn count_tokens(&self, text: &str) -> Result<usize> {
        let encoding = self
            .counting_tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        Ok(encoding.get_ids().len())
    }
}

fn load_tokenizer(path: &Path, max_length: Option<usize>) -> Result<Tokenizer, StartupError> {
    let failed = |reason: String| StartupError::Tokenizer {
        path: path.to_path_buf(),
        reason,
    };

    let mut tokenizer = Tokenizer::from_file(path).map_err(|e| failed(e.to_string()))?;
    let truncation = max_length.map(|max_length| TruncationParams {
        max_length,
        ..Default::default()
    });
    tokenizer
        .with_truncation(truncation)
        .map_err(|e| failed(e.to_string()))?;
    // Batches are padded by hand to the longest member
    tokenizer.with_padding(None);

    Ok(tokenizer)
}

fn build_session(model_file: &Path, intra_threads: usize) -> Result<Session, StartupError> {
    let build = || -> Result<Session> {
        Ok(Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads.max(1))
            .context("Failed to set intra threads")?
            .commit_from_file(model_file)
            .context("Failed to commit session")?)
    };

    build().map_err(|e| StartupError::Session {
        path: model_file.to_path_buf(),
        reason: format!("{:#}", e),
    })
}
