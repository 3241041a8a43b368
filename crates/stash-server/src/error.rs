// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use std::time::Duration;

use axum::{
	http::{header, HeaderValue, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use serde::{Deserialize, Serialize};
use stash_core::{BuildError, StashError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	/// Invalid request payload or parameters.
	#[error("Invalid request: {0}")]
	BadRequest(String),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	#[error("Rate limit exceeded: {limit}")]
	RateLimited { limit: String, retry_after: Duration },

	/// The credential store cannot be opened.
	#[error("Service unavailable: {0}")]
	ServiceUnavailable(String),

	#[error("Internal error: {0}")]
	Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ServerError {
	pub fn credential_not_found(name: &str) -> Self {
		Self::NotFound(format!("credential not found: {name}"))
	}

	pub fn status(&self) -> StatusCode {
		match self {
			Self::BadRequest(_) => StatusCode::BAD_REQUEST,
			Self::NotFound(_) => StatusCode::NOT_FOUND,
			Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
			Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
			Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
			Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl From<StashError> for ServerError {
	fn from(err: StashError) -> Self {
		match err {
			StashError::InvalidName(_) | StashError::InvalidField { .. } => {
				Self::BadRequest(err.to_string())
			}
			StashError::StoreUnavailable(_)
			| StashError::PasswordUnavailable(_)
			| StashError::BootstrapInconsistentState { .. } => {
				tracing::error!(error = %err, "credential store unavailable");
				Self::ServiceUnavailable("credential store unavailable".to_string())
			}
			StashError::StoreWrite(_) | StashError::Io { .. } => {
				tracing::error!(error = %err, "credential store write failed");
				Self::Internal("failed to write credential store".to_string())
			}
		}
	}
}

impl From<BuildError> for ServerError {
	fn from(err: BuildError) -> Self {
		match err {
			BuildError::NotFound(name) => Self::credential_not_found(&name),
			BuildError::Stash(e) => e.into(),
			other => Self::BadRequest(other.to_string()),
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let status = self.status();
		let (error, message) = match &self {
			Self::BadRequest(msg) => ("bad_request", msg.clone()),
			Self::NotFound(msg) => ("not_found", msg.clone()),
			Self::Unauthorized(msg) => ("unauthorized", msg.clone()),
			Self::RateLimited { limit, .. } => ("rate_limited", format!("rate limit exceeded: {limit}")),
			Self::ServiceUnavailable(msg) => ("service_unavailable", msg.clone()),
			Self::Internal(msg) => {
				tracing::error!(error = %msg, "internal error");
				("internal_error", "an internal error occurred".to_string())
			}
		};

		let body = Json(ErrorResponse {
			error: error.to_string(),
			message,
		});
		let mut response = (status, body).into_response();
		if let Self::RateLimited { retry_after, .. } = &self {
			let secs = retry_after.as_secs().max(1);
			if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
				response.headers_mut().insert(header::RETRY_AFTER, value);
			}
		}
		response
	}
}
