// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP API for a stash credential vault.
//!
//! `/api/health` is public. Everything under `/api/v1` passes the per-client
//! rate limiter and then API key authentication.

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod rate_limit;
pub mod routes;
pub mod state;

use axum::{
	middleware::{from_fn, from_fn_with_state},
	routing::get,
	Router,
};
use tower_http::trace::TraceLayer;

pub use auth::ApiKeySet;
pub use config::{ServerConfig, ServerConfigError};
pub use error::{ErrorResponse, ServerError};
pub use rate_limit::{RateLimit, RateLimiter};
pub use state::AppState;

pub fn create_router(state: AppState) -> Router {
	let api = Router::new()
		.route("/credentials", get(routes::credentials::list_credentials))
		.route(
			"/credentials/{name}",
			get(routes::credentials::get_credential)
				.post(routes::credentials::create_credential)
				.delete(routes::credentials::delete_credential),
		)
		.route(
			"/credentials/{name}/versions",
			get(routes::credentials::list_versions),
		)
		.route("/db-url/{name}", get(routes::db_url::get_db_url))
		.layer(from_fn_with_state(state.clone(), auth::require_api_key))
		.layer(from_fn_with_state(state.clone(), rate_limit::rate_limit));

	Router::new()
		.route("/api/health", get(routes::health::health_check))
		.nest("/api/v1", api)
		.layer(from_fn(logging::log_requests))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}
