// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedRequest type for POST /embed
//!
//! Accepts either a batch (`texts`) or the single-text convenience form
//! (`text`), never both.

use crate::api::ApiError;
use serde::{Deserialize, Serialize};

/// Request body for POST /embed
///
/// # Example
/// ```json
/// { "texts": ["gift for mom", "birthday present"], "normalize": true }
/// ```
/// or
/// ```json
/// { "text": "gift for mom" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    /// Texts to embed, in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texts: Option<Vec<String>>,

    /// Single text convenience form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// L2-normalize vectors to unit length
    /// Default: true
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Optional model name; must match the loaded model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn default_normalize() -> bool {
    true
}

impl EmbedRequest {
    pub fn batch<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            texts: Some(texts.into_iter().map(Into::into).collect()),
            text: None,
            normalize: true,
            model: None,
        }
    }

    pub fn single(text: impl Into<String>) -> Self {
        Self {
            texts: None,
            text: Some(text.into()),
            normalize: true,
            model: None,
        }
    }

    /// Validates the embed request
    ///
    /// # Validation Rules
    /// 1. exactly one of `text` / `texts` is present
    /// 2. `texts` holds 1..=`max_batch_size` items
    /// 3. no text is empty or whitespace-only
    ///
    /// Length is not checked here: over-long texts are truncated by the
    /// tokenizer unless the service runs with the reject policy.
    pub fn validate(&self, max_batch_size: usize) -> Result<(), ApiError> {
        let texts: &[String] = match (&self.texts, &self.text) {
            (Some(_), Some(_)) => {
                return Err(ApiError::InvalidRequest(
                    "provide either 'text' or 'texts', not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(ApiError::InvalidRequest(
                    "no text supplied: expected 'texts' or 'text'".to_string(),
                ))
            }
            (Some(texts), None) => texts,
            (None, Some(text)) => std::slice::from_ref(text),
        };

        if texts.is_empty() {
            return Err(ApiError::ValidationError {
                field: "texts".to_string(),
                message: "texts array must contain at least 1 item".to_string(),
            });
        }

        if texts.len() > max_batch_size {
            return Err(ApiError::ValidationError {
                field: "texts".to_string(),
                message: format!(
                    "texts array cannot contain more than {} items (got {})",
                    max_batch_size,
                    texts.len()
                ),
            });
        }

        for (index, text) in texts.iter().enumerate() {
            if text.trim().is_empty() {
                let field = if self.text.is_some() {
                    "text".to_string()
                } else {
                    format!("texts[{}]", index)
                };
                return Err(ApiError::ValidationError {
                    field,
                    message: "text cannot be empty or contain only whitespace".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Input texts in request order.
    pub fn into_texts(self) -> Vec<String> {
        match (self.texts, self.text) {
            (Some(texts), _) => texts,
            (None, Some(text)) => vec![text],
            (None, None) => Vec::new(),
        }
    }
}
