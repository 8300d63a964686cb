// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed HTTP handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use std::time::Instant;
use tracing::{debug, info};

use crate::api::embed::{EmbedRequest, EmbedResponse};
use crate::api::http_server::AppState;
use crate::api::ApiError;
use crate::config::TruncationPolicy;
use crate::embeddings::EmbedError;

/// POST /embed handler
///
/// `received → validated → embedded → serialized`. Validation failures are
/// answered here and never reach the model; inference failures become a
/// generic 500 for this request only.
///
/// # Request Body
/// ```json
/// { "texts": ["text1", "text2"], "normalize": true }
/// ```
///
/// # Response Body
/// ```json
/// { "embeddings": [[...384 floats...], [...]], "count": 2, "dimension": 384, ... }
/// ```
pub async fn embed_handler(
    State(state): State<AppState>,
    payload: Result<Json<EmbedRequest>, JsonRejection>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate(state.limits().max_batch_size)?;

    let runtime = state.runtime()?;
    if let Some(model) = request.model.as_deref() {
        if model != runtime.model_name() {
            return Err(ApiError::ModelNotFound {
                model: model.to_string(),
                available_models: vec![runtime.model_name().to_string()],
            });
        }
    }

    let normalize = request.normalize;
    let single_form = request.text.is_some();
    let texts = request.into_texts();
    let count = texts.len();
    let reject_over_length = state.limits().truncation_policy == TruncationPolicy::Reject;

    let started = Instant::now();
    // Length check and inference share one deadline
    let outcome = state
        .with_deadline(async move {
            if reject_over_length {
                let over = runtime.over_length(texts.clone()).await?;
                if let Some(&index) = over.first() {
                    return Ok::<_, EmbedError>(Err(index));
                }
            }
            runtime.embed(texts, normalize).await.map(Ok)
        })
        .await?;

    let embeddings = outcome.map_err(|index| ApiError::ValidationError {
        field: if single_form {
            "text".to_string()
        } else {
            format!("texts[{}]", index)
        },
        message: format!(
            "text exceeds the maximum sequence length of {} tokens",
            runtime.max_sequence_length()
        ),
    })?;

    let response = EmbedResponse::from_embeddings(
        runtime.model_name(),
        runtime.dimension(),
        embeddings,
        started.elapsed(),
    );

    if !response.truncated.is_empty() {
        debug!(truncated = ?response.truncated, "inputs truncated to max sequence length");
    }
    info!(
        count,
        total_tokens = response.total_tokens,
        processing_time_ms = response.processing_time_ms,
        "embeddings generated"
    );

    Ok(Json(response))
}
