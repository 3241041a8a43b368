// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::Json;
use serde::{Deserialize, Serialize};

pub const API_VERSION: &str = "v1";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub version: String,
}

/// GET /api/health - Liveness check. Does not touch the vault.
pub async fn health_check() -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "healthy".to_string(),
		version: API_VERSION.to_string(),
	})
}
