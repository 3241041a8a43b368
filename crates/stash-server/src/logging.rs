// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-request access logging.

use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};

/// Log method, path, status and latency for every request. Headers and
/// bodies are never logged since they carry API keys and secrets.
pub async fn log_requests(request: Request<Body>, next: Next) -> Response {
	let method = request.method().clone();
	let path = request.uri().path().to_string();
	let start = Instant::now();

	let response = next.run(request).await;

	let status = response.status().as_u16();
	let latency_ms = start.elapsed().as_millis() as u64;
	if response.status().is_server_error() {
		tracing::warn!(%method, %path, status, latency_ms, "request failed");
	} else {
		tracing::info!(%method, %path, status, latency_ms, "request completed");
	}
	response
}
