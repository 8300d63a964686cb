// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding API Module
//!
//! POST /embed (and /api/v1/embed): text in, 384-dimensional vectors out.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::embed_handler;
pub use request::EmbedRequest;
pub use response::EmbedResponse;
