// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

/// Characters of each input echoed back in the response
const PREVIEW_CHARS: usize = 100;

/// Response body for POST /api/v1/similarity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResponse {
    pub text1: String,
    pub text2: String,
    /// Cosine similarity rounded to 4 decimals
    pub similarity: f32,
    pub interpretation: String,
}

impl SimilarityResponse {
    pub fn new(text1: &str, text2: &str, similarity: f32) -> Self {
        Self {
            text1: preview(text1),
            text2: preview(text2),
            similarity: (similarity * 10_000.0).round() / 10_000.0,
            interpretation: interpret(similarity).to_string(),
        }
    }
}

/// Human-readable bucket for a cosine score
pub fn interpret(similarity: f32) -> &'static str {
    if similarity > 0.8 {
        "Very similar"
    } else if similarity > 0.6 {
        "Similar"
    } else if similarity > 0.4 {
        "Somewhat similar"
    } else {
        "Not very similar"
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
