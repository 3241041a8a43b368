// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime configuration types with resolved defaults.

use std::path::PathBuf;
use std::time::Duration;

use stash_core::builders::{
	DEFAULT_S3_MAX_ATTEMPTS, DEFAULT_S3_REGION, DEFAULT_S3_SIGNATURE_VERSION,
};
use stash_core::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
use stash_core::password::{DEFAULT_PASSWORD_ENV, DEFAULT_SIDECAR_BASENAME};
use stash_core::{
	AddressingStyle, CacheSettings, S3Options, StashOptions, DEFAULT_PAD_WIDTH,
	DEFAULT_PASSWORD_MASK,
};

use crate::layer::*;
use crate::paths::StashPaths;
use crate::ConfigError;

pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// The final, validated configuration for Stash.
#[derive(Debug, Clone)]
pub struct StashConfig {
	pub database: DatabaseConfig,
	pub versioning: VersioningConfig,
	pub display: DisplayConfig,
	pub cache: CacheConfig,
	pub s3: S3Config,
	pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub path: PathBuf,
	pub sidecar_basename: String,
	pub password_env: String,
	pub auto_bootstrap: bool,
}

#[derive(Debug, Clone)]
pub struct VersioningConfig {
	pub pad_width: usize,
}

#[derive(Debug, Clone)]
pub struct DisplayConfig {
	pub password_mask: String,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
	pub enabled: bool,
	pub ttl: Duration,
	pub capacity: usize,
}

#[derive(Debug, Clone)]
pub struct S3Config {
	pub region: String,
	pub addressing: AddressingStyle,
	pub signature_version: String,
	pub retries: u32,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
	pub level: String,
}

impl StashConfig {
	/// Apply defaults to every field the merged layer left unset.
	pub fn from_layer(layer: ConfigLayer, paths: &StashPaths) -> Result<Self, ConfigError> {
		let database = layer.database.unwrap_or_default();
		let versioning = layer.versioning.unwrap_or_default();
		let display = layer.display.unwrap_or_default();
		let cache = layer.cache.unwrap_or_default();
		let s3 = layer.s3.unwrap_or_default();
		let logging = layer.logging.unwrap_or_default();

		let addressing = match s3.addressing {
			Some(value) => value
				.parse()
				.map_err(|e: String| ConfigError::invalid_value("s3.addressing", e))?,
			None => AddressingStyle::default(),
		};

		Ok(Self {
			database: DatabaseConfig {
				path: database
					.path
					.unwrap_or_else(|| paths.default_db_path.clone()),
				sidecar_basename: database
					.sidecar_basename
					.unwrap_or_else(|| DEFAULT_SIDECAR_BASENAME.to_string()),
				password_env: database
					.password_env
					.unwrap_or_else(|| DEFAULT_PASSWORD_ENV.to_string()),
				auto_bootstrap: database.auto_bootstrap.unwrap_or(true),
			},
			versioning: VersioningConfig {
				pad_width: versioning.pad_width.unwrap_or(DEFAULT_PAD_WIDTH),
			},
			display: DisplayConfig {
				password_mask: display
					.password_mask
					.unwrap_or_else(|| DEFAULT_PASSWORD_MASK.to_string()),
			},
			cache: CacheConfig {
				enabled: cache.enabled.unwrap_or(false),
				ttl: cache
					.ttl_secs
					.map(Duration::from_secs)
					.unwrap_or(DEFAULT_CACHE_TTL),
				capacity: cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
			},
			s3: S3Config {
				region: s3.region.unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
				addressing,
				signature_version: s3
					.signature_version
					.unwrap_or_else(|| DEFAULT_S3_SIGNATURE_VERSION.to_string()),
				retries: s3.retries.unwrap_or(DEFAULT_S3_MAX_ATTEMPTS),
			},
			logging: LoggingConfig {
				level: logging
					.level
					.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
			},
		})
	}

	pub fn cache_settings(&self) -> Option<CacheSettings> {
		self.cache.enabled.then_some(CacheSettings {
			ttl: self.cache.ttl,
			capacity: self.cache.capacity,
		})
	}

	/// Options for a [`stash_core::Stash`] over the configured database.
	pub fn stash_options(&self) -> StashOptions {
		let mut options = StashOptions::new(&self.database.path);
		options.sidecar_basename = self.database.sidecar_basename.clone();
		options.password_env = self.database.password_env.clone();
		options.auto_bootstrap = self.database.auto_bootstrap;
		options.pad_width = self.versioning.pad_width;
		options.password_mask = self.display.password_mask.clone();
		options.cache = self.cache_settings();
		options
	}

	pub fn s3_options(&self) -> S3Options {
		S3Options {
			region: self.s3.region.clone(),
			addressing: self.s3.addressing,
			signature_version: self.s3.signature_version.clone(),
			max_attempts: self.s3.retries,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::Path;

	fn paths() -> StashPaths {
		StashPaths::rooted(Path::new("/cfg"), Path::new("/home/u"))
	}

	#[test]
	fn test_defaults_from_empty_layer() {
		let config = StashConfig::from_layer(ConfigLayer::default(), &paths()).unwrap();
		assert_eq!(config.database.path, PathBuf::from("/cfg/stash/stash.vault"));
		assert_eq!(config.database.sidecar_basename, ".stash.txt");
		assert_eq!(config.database.password_env, "STASH_PASSWORD");
		assert!(config.database.auto_bootstrap);
		assert_eq!(config.versioning.pad_width, 10);
		assert_eq!(config.display.password_mask, "*****");
		assert!(!config.cache.enabled);
		assert_eq!(config.cache.ttl, Duration::from_secs(300));
		assert_eq!(config.s3.region, "us-east-1");
		assert_eq!(config.s3.addressing, AddressingStyle::Path);
		assert_eq!(config.s3.retries, 10);
		assert_eq!(config.logging.level, "warn");
		assert!(config.cache_settings().is_none());
	}

	#[test]
	fn test_stash_options_reflect_config() {
		let layer: ConfigLayer = toml::from_str(
			r#"
			[database]
			path = "/srv/stash.vault"
			sidecar_basename = ".pw"
			[cache]
			enabled = true
			capacity = 8
			"#,
		)
		.unwrap();
		let config = StashConfig::from_layer(layer, &paths()).unwrap();
		let options = config.stash_options();
		assert_eq!(options.sidecar_path(), PathBuf::from("/srv/.pw"));
		assert_eq!(options.cache.unwrap().capacity, 8);
	}

	#[test]
	fn test_bad_addressing_is_invalid_value() {
		let mut layer = ConfigLayer::default();
		layer.s3_mut().addressing = Some("dns".into());
		assert!(matches!(
			StashConfig::from_layer(layer, &paths()),
			Err(ConfigError::InvalidValue { .. })
		));
	}
}
