// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::embed::embed_handler;
use super::handlers::{health_handler, model_info_handler, not_found_handler, root_handler};
use super::similarity::similarity_handler;
use super::ApiError;
use crate::config::RequestLimits;
use crate::embeddings::{EmbedError, EmbeddingRuntime};

/// Shared state handed to every handler.
///
/// The model handle sits behind a one-shot barrier: it is published once and
/// then only read, so handlers never take a lock to reach it.
#[derive(Clone)]
pub struct AppState {
    runtime: Arc<OnceLock<EmbeddingRuntime>>,
    limits: Arc<RequestLimits>,
}

impl AppState {
    /// State with no model yet; `/health` reports not ready and `/embed` answers 503.
    pub fn new(limits: RequestLimits) -> Self {
        Self {
            runtime: Arc::new(OnceLock::new()),
            limits: Arc::new(limits),
        }
    }

    pub fn with_runtime(runtime: EmbeddingRuntime, limits: RequestLimits) -> Self {
        let state = Self::new(limits);
        // fresh OnceLock, cannot already be set
        let _ = state.runtime.set(runtime);
        state
    }

    /// Publishes the model handle. Only the first call wins.
    pub fn set_runtime(&self, runtime: EmbeddingRuntime) -> Result<(), EmbeddingRuntime> {
        self.runtime.set(runtime)
    }

    pub fn runtime(&self) -> Result<&EmbeddingRuntime, ApiError> {
        self.runtime
            .get()
            .ok_or_else(|| ApiError::ServiceUnavailable("Model not loaded".to_string()))
    }

    pub fn is_ready(&self) -> bool {
        self.runtime.get().is_some()
    }

    pub fn limits(&self) -> &RequestLimits {
        &self.limits
    }

    /// Awaits a runtime call under the request deadline.
    ///
    /// On expiry the caller gets [`ApiError::Timeout`] and the result is
    /// discarded; no partial output escapes.
    pub async fn with_deadline<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, EmbedError>>,
    {
        match tokio::time::timeout(self.limits.request_timeout, work).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ApiError::inference_failed(e)),
            Err(_) => {
                warn!(
                    timeout_ms = self.limits.request_timeout.as_millis() as u64,
                    "embedding request timed out"
                );
                Err(ApiError::Timeout)
            }
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.limits.max_body_bytes;

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/embed", post(embed_handler))
        .route("/api/v1/embed", post(embed_handler))
        .route("/api/v1/model-info", get(model_info_handler))
        .route("/api/v1/similarity", post(similarity_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves `state` on `listener` until `shutdown` resolves, then drains
/// in-flight requests.
pub async fn serve<S>(listener: TcpListener, state: AppState, shutdown: S) -> anyhow::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    if !state.is_ready() {
        warn!("serving without a loaded model; /embed will answer 503");
    }

    let app = create_app(state);
    info!(addr = %listener.local_addr()?, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("⏹️  Ctrl+C received, shutting down"),
        _ = terminate => info!("⏹️  SIGTERM received, shutting down"),
    }
}
