// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Deterministic hashing embedder.
//!
//! Needs no model files. Each whitespace token is hashed into a
//! pseudo-random vector and the sentence vector is the mean of its tokens,
//! so texts sharing words land close together. Used by the test-suite and
//! for smoke-testing the HTTP layer without ONNX artifacts.

use anyhow::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::pooling::l2_normalize;
use super::{Embedding, TextEmbedder, EMBEDDING_DIMENSION, MAX_SEQUENCE_LENGTH};

/// Special tokens wrapped around every input, mirroring `[CLS]` / `[SEP]`
const SPECIAL_TOKENS: usize = 2;

#[derive(Debug, Clone)]
pub struct HashedEmbeddingModel {
    model_name: String,
    dimension: usize,
    max_length: usize,
}

impl Default for HashedEmbeddingModel {
    fn default() -> Self {
        Self::new("hashed-minilm", EMBEDDING_DIMENSION, MAX_SEQUENCE_LENGTH)
    }
}

impl HashedEmbeddingModel {
    pub fn new(model_name: impl Into<String>, dimension: usize, max_length: usize) -> Self {
        Self {
            model_name: model_name.into(),
            dimension,
            // room for at least one word next to the special tokens
            max_length: max_length.max(SPECIAL_TOKENS + 1),
        }
    }

    fn token_vector(&self, token: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let mut current_seed = hasher.finish();

        (0..self.dimension)
            .map(|i| {
                // Linear congruential generator seeded by the token hash
                current_seed = current_seed
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407)
                    ^ (i as u64);
                ((current_seed >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0) as f32
            })
            .collect()
    }

    fn embed_one(&self, text: &str, normalize: bool) -> Embedding {
        let words: Vec<&str> = text.split_whitespace().collect();
        let kept = words.len().min(self.max_length - SPECIAL_TOKENS);

        let mut vector = vec![0.0f32; self.dimension];
        for word in &words[..kept] {
            let lowered = word.to_lowercase();
            for (acc, value) in vector.iter_mut().zip(self.token_vector(&lowered)) {
                *acc += value;
            }
        }
        if kept > 0 {
            for value in &mut vector {
                *value /= kept as f32;
            }
        }
        if normalize {
            l2_normalize(&mut vector);
        }

        Embedding {
            vector,
            token_count: kept + SPECIAL_TOKENS,
            truncated: kept < words.len(),
        }
    }
}

impl TextEmbedder for HashedEmbeddingModel {
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
        Ok(texts
            .iter()
            .map(|text| self.embed_one(text, normalize))
            .collect())
    }

    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(text.split_whitespace().count() + SPECIAL_TOKENS)
    }
}
