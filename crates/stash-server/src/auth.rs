// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `X-API-Key` authentication.

use axum::{
	body::Body,
	extract::State,
	http::Request,
	middleware::Next,
	response::{IntoResponse, Response},
};
use stash_common_secret::SecretString;
use subtle::ConstantTimeEq;

use crate::error::ServerError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// The keys accepted by the server.
#[derive(Debug, Clone, Default)]
pub struct ApiKeySet {
	keys: Vec<SecretString>,
}

impl ApiKeySet {
	pub fn new(keys: impl IntoIterator<Item = SecretString>) -> Self {
		let mut set = Self::default();
		for key in keys {
			set.insert(key);
		}
		set
	}

	/// Add `key` unless it is blank or already present.
	pub fn insert(&mut self, key: SecretString) {
		if key.is_blank() || self.contains(key.expose()) {
			return;
		}
		self.keys.push(key);
	}

	/// One key per line. Blank lines and lines starting with `#` are skipped.
	pub fn extend_from_lines(&mut self, content: &str) {
		for line in content.lines().map(str::trim) {
			if line.is_empty() || line.starts_with('#') {
				continue;
			}
			self.insert(SecretString::new(line.to_string()));
		}
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Compare `candidate` against every key without short-circuiting.
	pub fn contains(&self, candidate: &str) -> bool {
		let candidate = candidate.as_bytes();
		self.keys
			.iter()
			.fold(subtle::Choice::from(0), |found, key| {
				found | key.expose().as_bytes().ct_eq(candidate)
			})
			.into()
	}
}

/// Reject requests without a valid `X-API-Key` header.
pub async fn require_api_key(
	State(state): State<AppState>,
	request: Request<Body>,
	next: Next,
) -> Response {
	let Some(value) = request.headers().get(API_KEY_HEADER) else {
		return ServerError::Unauthorized("Missing API key. Provide X-API-Key header.".into())
			.into_response();
	};

	let valid = value
		.to_str()
		.map(|key| state.api_keys.contains(key))
		.unwrap_or(false);
	if !valid {
		tracing::warn!(
			security = true,
			method = %request.method(),
			path = %request.uri().path(),
			"rejected request with invalid API key"
		);
		return ServerError::Unauthorized("Invalid API key".into()).into_response();
	}

	next.run(request).await
}
