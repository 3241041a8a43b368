// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::SocketAddr;
use std::sync::Arc;

use stash_core::Stash;
use stash_server::{create_router, AppState, RateLimiter, ServerConfig};
use stash_vault::FileVault;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenvy::dotenv().ok();

	let config = ServerConfig::from_env()?;

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.log_level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	if !config.db_path.exists() {
		tracing::warn!(
			path = %config.db_path.display(),
			"vault file does not exist; credential requests will fail until it is created"
		);
	}

	let stash = Stash::new(Arc::new(FileVault::new()), config.stash_options());
	let state = AppState::new(
		stash,
		config.api_keys.clone(),
		RateLimiter::new(config.rate_limit),
	);
	let app = create_router(state.clone());

	let addr = config.socket_addr();
	tracing::info!(
		%addr,
		db_path = %config.db_path.display(),
		api_keys = config.api_keys.len(),
		rate_limit = %config.rate_limit,
		cache = config.cache.is_some(),
		"stash server listening"
	);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(
			listener,
			app.into_make_service_with_connect_info::<SocketAddr>(),
		) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received shutdown signal");
		}
	}

	state.close().await;
	tracing::info!("server shutdown complete");
	Ok(())
}
