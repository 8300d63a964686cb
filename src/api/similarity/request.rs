// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::api::ApiError;
use serde::{Deserialize, Serialize};

/// Request body for POST /api/v1/similarity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityRequest {
    pub text1: String,
    pub text2: String,
}

impl SimilarityRequest {
    pub fn new(text1: impl Into<String>, text2: impl Into<String>) -> Self {
        Self {
            text1: text1.into(),
            text2: text2.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        for (field, text) in [("text1", &self.text1), ("text2", &self.text2)] {
            if text.trim().is_empty() {
                return Err(ApiError::ValidationError {
                    field: field.to_string(),
                    message: "text cannot be empty or contain only whitespace".to_string(),
                });
            }
        }
        Ok(())
    }
}
