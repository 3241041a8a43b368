// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server configuration from `STASH_*` environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use stash_common_secret::{load_secret_with, SecretEnvError, SecretString};
use stash_core::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
use stash_core::{CacheSettings, StashOptions};
use thiserror::Error;

use crate::auth::ApiKeySet;
use crate::rate_limit::RateLimit;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DB_PATH: &str = "/data/stash.vault";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ServerConfigError {
	#[error("invalid value for {var}: {message}")]
	InvalidValue { var: &'static str, message: String },

	#[error("the vault password must be provided via STASH_PASSWORD or STASH_PASSWORD_FILE")]
	MissingPassword,

	#[error("at least one API key must be provided via STASH_API_KEY or STASH_API_KEYS_FILE")]
	MissingApiKeys,

	#[error(transparent)]
	Secret(#[from] SecretEnvError),

	#[error("failed to read API keys file {}: {source}", path.display())]
	KeysFile {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

#[derive(Debug)]
pub struct ServerConfig {
	pub host: IpAddr,
	pub port: u16,
	pub db_path: PathBuf,
	pub password: SecretString,
	pub api_keys: ApiKeySet,
	pub rate_limit: RateLimit,
	pub log_level: String,
	pub cache: Option<CacheSettings>,
}

impl ServerConfig {
	/// Read the process environment.
	pub fn from_env() -> Result<Self, ServerConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Read settings through `lookup`. Blank values count as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

		let host = match get("STASH_SERVER_HOST") {
			Some(value) => value.parse().map_err(|_| ServerConfigError::InvalidValue {
				var: "STASH_SERVER_HOST",
				message: format!("'{value}' is not an IP address"),
			})?,
			None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
		};
		let port = match get("STASH_SERVER_PORT") {
			Some(value) => value.parse().map_err(|_| ServerConfigError::InvalidValue {
				var: "STASH_SERVER_PORT",
				message: format!("'{value}' is not a port number"),
			})?,
			None => DEFAULT_PORT,
		};

		let password = load_secret_with("STASH_PASSWORD", &lookup)?
			.ok_or(ServerConfigError::MissingPassword)?;

		let mut api_keys = ApiKeySet::default();
		if let Some(key) = get("STASH_API_KEY") {
			api_keys.insert(SecretString::new(key));
		}
		if let Some(path) = get("STASH_API_KEYS_FILE") {
			let path = PathBuf::from(path);
			let content = std::fs::read_to_string(&path)
				.map_err(|source| ServerConfigError::KeysFile { path, source })?;
			api_keys.extend_from_lines(&content);
		}
		if api_keys.is_empty() {
			return Err(ServerConfigError::MissingApiKeys);
		}

		let rate_limit = match get("STASH_RATE_LIMIT") {
			Some(value) => value.parse().map_err(|message| ServerConfigError::InvalidValue {
				var: "STASH_RATE_LIMIT",
				message,
			})?,
			None => RateLimit::default(),
		};

		let cache_enabled = match get("STASH_ENABLE_CACHE") {
			Some(value) => parse_bool("STASH_ENABLE_CACHE", &value)?,
			None => false,
		};
		let cache_ttl = match get("STASH_CACHE_TTL") {
			Some(value) => Duration::from_secs(value.parse().map_err(|_| {
				ServerConfigError::InvalidValue {
					var: "STASH_CACHE_TTL",
					message: format!("'{value}' is not a number of seconds"),
				}
			})?),
			None => DEFAULT_CACHE_TTL,
		};

		Ok(Self {
			host,
			port,
			db_path: get("STASH_DB_PATH")
				.map(PathBuf::from)
				.unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
			password,
			api_keys,
			rate_limit,
			log_level: get("STASH_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
			cache: cache_enabled.then_some(CacheSettings {
				ttl: cache_ttl,
				capacity: DEFAULT_CACHE_CAPACITY,
			}),
		})
	}

	pub fn socket_addr(&self) -> SocketAddr {
		SocketAddr::new(self.host, self.port)
	}

	/// Options for the server's [`stash_core::Stash`]. The server never
	/// bootstraps a vault; the password must unlock an existing one.
	pub fn stash_options(&self) -> StashOptions {
		let mut options = StashOptions::new(&self.db_path).with_password(self.password.clone());
		options.auto_bootstrap = false;
		options.cache = self.cache;
		options
	}
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ServerConfigError> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(ServerConfigError::InvalidValue {
			var,
			message: format!("expected a boolean, got '{value}'"),
		}),
	}
}
