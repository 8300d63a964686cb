// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Similarity API Module
//!
//! POST /api/v1/similarity: cosine similarity between two texts.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::similarity_handler;
pub use request::SimilarityRequest;
pub use response::SimilarityResponse;
