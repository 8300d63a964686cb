// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Every option can be given as a command-line flag or an environment
//! variable (a local `.env` file is loaded first by the binary).

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Where the provisioning step installs the model by default
pub const DEFAULT_MODEL_PATH: &str = "/opt/models/minilm";

/// Upper bound on texts per request
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than 0")]
    Zero { field: &'static str },

    #[error("invalid bind address {0}")]
    BindAddress(String),
}

/// What to do with inputs longer than the model's max sequence length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationPolicy {
    /// Keep the first tokens and embed them
    #[default]
    Truncate,
    /// Reject the request with a client error
    Reject,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "text-embedding-service")]
#[command(version)]
#[command(about = "HTTP service turning text into 384-dimensional sentence embeddings", long_about = None)]
pub struct ServiceConfig {
    /// Model directory (model.onnx + tokenizer.json) or path to the .onnx file
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// Interface to bind
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "API_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Concurrent inference batches (one ONNX session each)
    #[arg(long, env = "INFERENCE_WORKERS", default_value_t = 2)]
    pub inference_workers: usize,

    /// ONNX Runtime intra-op threads per session
    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Maximum texts per /embed request
    #[arg(long, env = "MAX_BATCH_SIZE", default_value_t = DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch_size: usize,

    /// Per-request inference deadline in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = 2 * 1024 * 1024)]
    pub max_body_bytes: usize,

    /// Handling of texts longer than the max sequence length
    #[arg(long, env = "TRUNCATION_POLICY", value_enum, default_value_t = TruncationPolicy::Truncate)]
    pub truncation_policy: TruncationPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            host: "0.0.0.0".to_string(),
            port: 8000,
            inference_workers: 2,
            intra_threads: 4,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            request_timeout_secs: 30,
            max_body_bytes: 2 * 1024 * 1024,
            truncation_policy: TruncationPolicy::Truncate,
        }
    }
}

impl ServiceConfig {
    /// Fail-fast checks run before anything is loaded
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("inference_workers", self.inference_workers),
            ("intra_threads", self.intra_threads),
            ("max_batch_size", self.max_batch_size),
            ("max_body_bytes", self.max_body_bytes),
            ("request_timeout_secs", self.request_timeout_secs as usize),
        ];
        if let Some(&(field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero { field });
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or(ConfigError::BindAddress(raw))
    }

    pub fn request_limits(&self) -> RequestLimits {
        RequestLimits {
            max_batch_size: self.max_batch_size,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_body_bytes: self.max_body_bytes,
            truncation_policy: self.truncation_policy,
        }
    }
}

/// Per-request limits enforced by the HTTP layer.
#[derive(Debug, Clone)]
pub struct RequestLimits {
    pub max_batch_size: usize,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    pub truncation_policy: TruncationPolicy,
}

impl Default for RequestLimits {
    fn default() -> Self {
        ServiceConfig::default().request_limits()
    }
}
