// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use text_embedding_service::{
    api::{serve, shutdown_signal, AppState},
    config::ServiceConfig,
    embeddings::EmbeddingRuntime,
    version,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🚀 Starting Text Embedding Service...\n");
    println!("📦 BUILD VERSION: {}", version::VERSION);
    println!("📅 Build Date: {}", version::BUILD_DATE);
    println!();
    info!(features = ?version::FEATURES, "{}", version::get_version_string());

    let config = ServiceConfig::parse();
    config.validate().context("invalid configuration")?;
    let addr = config.bind_addr().context("invalid bind address")?;

    info!(
        model_path = %config.model_path.display(),
        inference_workers = config.inference_workers,
        max_batch_size = config.max_batch_size,
        request_timeout_secs = config.request_timeout_secs,
        truncation_policy = ?config.truncation_policy,
        "configuration loaded"
    );

    // The listener is only opened once the model is usable.
    let runtime = match EmbeddingRuntime::load(&config).await {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, model_path = %config.model_path.display(), "❌ Failed to load embedding model");
            return Err(e).context("startup failed");
        }
    };

    let state = AppState::new(config.request_limits());
    if state.set_runtime(runtime).is_err() {
        anyhow::bail!("model handle published twice");
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    println!("✅ Ready: http://{}", addr);
    println!("   POST /embed        {{\"texts\": [\"...\"]}}");
    println!("   GET  /health");
    println!("\nPress Ctrl+C to shutdown...");

    serve(listener, state, shutdown_signal()).await?;

    info!("👋 Shutdown complete");
    Ok(())
}
