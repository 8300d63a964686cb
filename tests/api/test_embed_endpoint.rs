// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed success paths: shapes, ordering, determinism, truncation.

use super::common::{app_with_model, hashed_app, norm, post_json, vectors};
use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use text_embedding_service::{
    config::{RequestLimits, TruncationPolicy},
    embeddings::{HashedEmbeddingModel, EMBEDDING_DIMENSION, MAX_SEQUENCE_LENGTH},
};

fn long_text(words: usize) -> String {
    vec!["word"; words].join(" ")
}

#[tokio::test]
async fn test_batch_of_two_returns_unit_vectors() {
    let app = hashed_app();

    let (status, body) = post_json(
        &app,
        "/embed",
        &json!({"texts": ["gift for mom", "birthday present"]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["count"], 2);
    assert_eq!(body["dimension"], EMBEDDING_DIMENSION);
    assert_eq!(body["model"], "hashed-minilm");
    assert!(body.get("truncated").is_none());

    let vectors = vectors(&body);
    assert_eq!(vectors.len(), 2);
    for v in &vectors {
        assert_eq!(v.len(), EMBEDDING_DIMENSION);
        assert!((norm(v) - 1.0).abs() < 1e-3, "norm was {}", norm(v));
        assert!(v.iter().all(|x| x.is_finite()));
    }
    assert_ne!(vectors[0], vectors[1]);
}

#[tokio::test]
async fn test_single_text_form() {
    let app = hashed_app();

    let (status, body) = post_json(&app, "/embed", &json!({"text": "gift for mom"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(vectors(&body)[0].len(), EMBEDDING_DIMENSION);
    assert_eq!(body["total_tokens"], 5);
}

#[tokio::test]
async fn test_versioned_route_matches_plain_route() {
    let app = hashed_app();
    let request = json!({"texts": ["semantic search"]});

    let (status_a, body_a) = post_json(&app, "/embed", &request).await;
    let (status_b, body_b) = post_json(&app, "/api/v1/embed", &request).await;

    assert_eq!(status_a, StatusCode::OK);
    assert_eq!(status_b, StatusCode::OK);
    assert_eq!(vectors(&body_a), vectors(&body_b));
}

#[tokio::test]
async fn test_batch_matches_individual_requests_in_order() {
    let app = hashed_app();
    let texts = ["first text", "a completely different sentence", "third", "first text"];

    let (status, batch) = post_json(&app, "/embed", &json!({ "texts": texts })).await;
    assert_eq!(status, StatusCode::OK);
    let batch = vectors(&batch);

    for (i, text) in texts.iter().enumerate() {
        let (status, single) = post_json(&app, "/embed", &json!({ "texts": [text] })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(batch[i], vectors(&single)[0], "mismatch at index {}", i);
    }
    // duplicates inside one batch embed identically
    assert_eq!(batch[0], batch[3]);
}

#[tokio::test]
async fn test_repeated_requests_are_identical() {
    let app = hashed_app();
    let request = json!({"texts": ["gift for mom", "birthday present"]});

    let (_, first) = post_json(&app, "/embed", &request).await;
    let (_, second) = post_json(&app, "/embed", &request).await;

    assert_eq!(vectors(&first), vectors(&second));
}

#[tokio::test]
async fn test_normalize_false_returns_raw_mean() {
    let app = hashed_app();

    let (status, body) = post_json(
        &app,
        "/embed",
        &json!({"texts": ["gift for mom"], "normalize": false}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let v = &vectors(&body)[0];
    assert_eq!(v.len(), EMBEDDING_DIMENSION);
    assert!((norm(v) - 1.0).abs() > 1e-3);
}

#[tokio::test]
async fn test_overlong_text_is_truncated_and_reported() {
    let app = hashed_app();

    let (status, body) = post_json(
        &app,
        "/embed",
        &json!({"texts": ["short", long_text(1000)]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["truncated"], json!([1]));
    // 1 word + 2 special tokens, then a full window
    assert_eq!(body["total_tokens"], 3 + MAX_SEQUENCE_LENGTH);
    assert_eq!(vectors(&body)[1].len(), EMBEDDING_DIMENSION);
}

#[tokio::test]
async fn test_reject_policy_refuses_overlong_text() {
    let limits = RequestLimits {
        truncation_policy: TruncationPolicy::Reject,
        ..RequestLimits::default()
    };
    let app = app_with_model(Arc::new(HashedEmbeddingModel::default()), limits);

    let (status, body) = post_json(
        &app,
        "/embed",
        &json!({"texts": ["short", long_text(1000)]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");
    assert_eq!(body["details"]["field"], "texts[1]");

    // within the limit still works under the reject policy
    let (status, _) = post_json(&app, "/embed", &json!({"texts": ["short"]})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unicode_text() {
    let app = hashed_app();

    let (status, body) = post_json(
        &app,
        "/embed",
        &json!({"texts": ["regalo para mamá 🎁", "誕生日プレゼント"]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_matching_model_name_accepted() {
    let app = hashed_app();

    let (status, _) = post_json(
        &app,
        "/embed",
        &json!({"texts": ["hello"], "model": "hashed-minilm"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_max_batch_size_accepted() {
    let app = hashed_app();
    let texts: Vec<String> = (0..100).map(|i| format!("text number {}", i)).collect();

    let (status, body) = post_json(&app, "/embed", &json!({ "texts": texts })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 100);
}

#[tokio::test]
async fn test_reject_policy_names_single_text_field() {
    let limits = RequestLimits {
        truncation_policy: TruncationPolicy::Reject,
        ..RequestLimits::default()
    };
    let app = app_with_model(Arc::new(HashedEmbeddingModel::default()), limits);

    let (status, body) = post_json(&app, "/embed", &json!({ "text": long_text(1000) })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "text");
}
