// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::{Arc, Mutex};

use stash_core::Stash;

use crate::auth::ApiKeySet;
use crate::error::ServerError;
use crate::rate_limit::RateLimiter;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
	stash: Arc<Mutex<Stash>>,
	pub api_keys: Arc<ApiKeySet>,
	pub limiter: RateLimiter,
}

impl AppState {
	pub fn new(stash: Stash, api_keys: ApiKeySet, limiter: RateLimiter) -> Self {
		Self {
			stash: Arc::new(Mutex::new(stash)),
			api_keys: Arc::new(api_keys),
			limiter,
		}
	}

	/// Run `f` against the stash on the blocking pool. Vault access does file
	/// I/O and key derivation, so it stays off the async workers.
	pub async fn with_stash<T, E, F>(&self, f: F) -> Result<T, ServerError>
	where
		F: FnOnce(&mut Stash) -> Result<T, E> + Send + 'static,
		T: Send + 'static,
		E: Into<ServerError> + Send + 'static,
	{
		let stash = Arc::clone(&self.stash);
		tokio::task::spawn_blocking(move || {
			let mut guard = stash.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
			f(&mut *guard).map_err(Into::into)
		})
		.await
		.map_err(|e| ServerError::Internal(format!("stash task failed: {e}")))?
	}

	/// Drop the open vault handle so the next request reopens it.
	pub async fn close(&self) {
		let stash = Arc::clone(&self.stash);
		let _ = tokio::task::spawn_blocking(move || {
			stash
				.lock()
				.unwrap_or_else(|poisoned| poisoned.into_inner())
				.close();
		})
		.await;
	}
}
