// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! PostgreSQL connection URLs in SQLAlchemy form.
//!
//! Mapping from the credential: username and password form the userinfo,
//! `url` gives `host:port`, the `database`/`dbname` property names the
//! database and the optional `sslmode` property becomes a query parameter.

use super::{fetch_credential, BuildError};
use crate::stash::Stash;
use crate::validation::split_host_port;

pub const DEFAULT_DB_DRIVER: &str = "psycopg";

/// How the password appears in a built URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MaskMode {
	/// `user:*****@host`
	#[default]
	Stars,
	/// `user@host`
	Omit,
	/// The real password.
	Reveal,
}

#[derive(Debug, Clone)]
pub struct DbUrlOptions {
	/// Driver suffix, giving `postgresql+<driver>://`. `None` gives `postgresql://`.
	pub driver: Option<String>,
	/// Overrides the credential's `database`/`dbname` property.
	pub database: Option<String>,
	/// Overrides the credential's `sslmode` property.
	pub sslmode_override: Option<String>,
	pub mask: MaskMode,
}

impl Default for DbUrlOptions {
	fn default() -> Self {
		Self {
			driver: Some(DEFAULT_DB_DRIVER.to_string()),
			database: None,
			sslmode_override: None,
			mask: MaskMode::Stars,
		}
	}
}

pub fn build_db_url(
	stash: &mut Stash,
	name: &str,
	options: &DbUrlOptions,
) -> Result<String, BuildError> {
	let credential = fetch_credential(stash, name)?;
	let endpoint = credential
		.url
		.as_deref()
		.ok_or(BuildError::MissingPort)?;
	let (host, port) = parse_host_port(endpoint)?;

	let property = |key: &str| {
		credential
			.custom_properties
			.get(key)
			.filter(|v| !v.is_empty())
			.cloned()
	};
	let database = options
		.database
		.clone()
		.filter(|d| !d.is_empty())
		.or_else(|| property("database"))
		.or_else(|| property("dbname"))
		.ok_or(BuildError::MissingDatabase)?;
	let sslmode = match &options.sslmode_override {
		Some(mode) => Some(mode.clone()),
		None => property("sslmode"),
	}
	.filter(|m| !m.is_empty());

	let dialect = match options.driver.as_deref().filter(|d| !d.is_empty()) {
		Some(driver) => format!("postgresql+{driver}"),
		None => "postgresql".to_string(),
	};
	let user = credential.username.as_deref().unwrap_or_default();
	let userinfo = match (options.mask, credential.password.as_deref()) {
		(MaskMode::Omit, _) | (_, None) => user.to_string(),
		(MaskMode::Stars, Some(_)) => format!("{user}:*****"),
		(MaskMode::Reveal, Some(password)) => format!("{user}:{password}"),
	};

	let mut url = format!("{dialect}://{userinfo}@{host}:{port}/{database}");
	if let Some(mode) = sslmode {
		url.push_str("?sslmode=");
		url.push_str(&mode);
	}
	Ok(url)
}

/// Host and port from a bare `host:port` or a `scheme://[user@]host:port/...`
/// URL. The port is required.
fn parse_host_port(endpoint: &str) -> Result<(String, u16), BuildError> {
	let endpoint = endpoint.trim();
	if endpoint.is_empty() {
		return Err(BuildError::MissingPort);
	}

	let authority = match endpoint.split_once("://") {
		Some((_, rest)) => {
			let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
			authority.rsplit_once('@').map_or(authority, |(_, host)| host)
		}
		None => endpoint,
	};

	let (host, port) = split_host_port(authority).ok_or(BuildError::MissingPort)?;
	let host = host.trim_matches('/');
	if host.is_empty() {
		return Err(BuildError::InvalidEndpoint(format!("no host in '{endpoint}'")));
	}
	if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
		return Err(BuildError::InvalidPort(port.to_string()));
	}
	let port = port
		.parse::<u16>()
		.map_err(|_| BuildError::InvalidPort(port.to_string()))?;
	Ok((host.to_string(), port))
}
