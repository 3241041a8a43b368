// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database URL handler.

use axum::{
	extract::{Path, Query, State},
	Json,
};
use serde::{Deserialize, Serialize};
use stash_core::builders::{DbUrlOptions, MaskMode, DEFAULT_DB_DRIVER};

use crate::error::ServerError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DbUrlQuery {
	/// An empty driver gives a plain `postgresql://` scheme.
	pub driver: Option<String>,
	pub database: Option<String>,
	pub sslmode: Option<String>,
	#[serde(default = "default_mask")]
	pub mask_password: bool,
}

fn default_mask() -> bool {
	true
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DbUrlResponse {
	pub url: String,
}

impl DbUrlQuery {
	fn into_options(self) -> DbUrlOptions {
		let driver = match self.driver {
			Some(driver) if driver.trim().is_empty() => None,
			Some(driver) => Some(driver),
			None => Some(DEFAULT_DB_DRIVER.to_string()),
		};
		DbUrlOptions {
			driver,
			database: self.database,
			sslmode_override: self.sslmode,
			mask: if self.mask_password {
				MaskMode::Stars
			} else {
				MaskMode::Reveal
			},
		}
	}
}

/// GET /api/v1/db-url/{name}
pub async fn get_db_url(
	State(state): State<AppState>,
	Path(name): Path<String>,
	Query(query): Query<DbUrlQuery>,
) -> Result<Json<DbUrlResponse>, ServerError> {
	let options = query.into_options();
	let url = state
		.with_stash(move |stash| stash.db_url(&name, &options))
		.await?;
	Ok(Json(DbUrlResponse { url }))
}
