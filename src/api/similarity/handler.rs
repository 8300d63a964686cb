// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /api/v1/similarity HTTP handler

use axum::body::Bytes;
use axum::extract::{rejection::BytesRejection, Query, State};
use axum::Json;

use crate::api::http_server::AppState;
use crate::api::similarity::{SimilarityRequest, SimilarityResponse};
use crate::api::ApiError;
use crate::embeddings::pooling::cosine_similarity;

/// Embeds both texts normalized in one batch and compares them.
///
/// The texts come either as query parameters
/// (`?text1=...&text2=...`) or as a JSON body `{"text1": ..., "text2": ...}`.
/// A non-empty body takes precedence.
pub async fn similarity_handler(
    State(state): State<AppState>,
    query: Option<Query<SimilarityRequest>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SimilarityResponse>, ApiError> {
    let body = body?;
    let request = if !body.iter().all(u8::is_ascii_whitespace) {
        Json::<SimilarityRequest>::from_bytes(&body)?.0
    } else if let Some(Query(request)) = query {
        request
    } else {
        return Err(ApiError::InvalidRequest(
            "expected 'text1' and 'text2' as query parameters or a JSON body".to_string(),
        ));
    };
    request.validate()?;

    let runtime = state.runtime()?;
    let embeddings = state
        .with_deadline(runtime.embed(vec![request.text1.clone(), request.text2.clone()], true))
        .await?;

    let similarity = cosine_similarity(&embeddings[0].vector, &embeddings[1].vector);
    Ok(Json(SimilarityResponse::new(
        &request.text1,
        &request.text2,
        similarity,
    )))
}
