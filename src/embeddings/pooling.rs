// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Sentence pooling helpers shared by the embedding backends.

use ndarray::ArrayView2;

/// Mean pooling over token embeddings `[seq_len, hidden_dim]`, weighted by
/// the attention mask so padding tokens do not contribute.
pub fn mean_pool(token_embeddings: ArrayView2<'_, f32>, attention_mask: &[i64]) -> Vec<f32> {
    let (seq_len, hidden_dim) = token_embeddings.dim();

    let mut pooled = vec![0.0f32; hidden_dim];
    let mut sum_mask = 0.0f32;

    for i in 0..seq_len.min(attention_mask.len()) {
        let mask_value = attention_mask[i] as f32;
        if mask_value == 0.0 {
            continue;
        }
        sum_mask += mask_value;
        for (j, value) in pooled.iter_mut().enumerate() {
            *value += token_embeddings[[i, j]] * mask_value;
        }
    }

    let denom = sum_mask.max(1e-9);
    for value in &mut pooled {
        *value /= denom;
    }

    pooled
}

/// Scales `vector` to unit length in place. Zero vectors are left as is.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Cosine similarity of two equally sized vectors. Returns 0.0 if either is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
