// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration validation rules.

use stash_core::codec::MAX_PAD_WIDTH;
use tracing::warn;

use crate::runtime::StashConfig;
use crate::ConfigError;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Validate the configuration.
pub fn validate_config(config: &StashConfig) -> Result<(), ConfigError> {
	validate_database(config)?;
	validate_versioning(config)?;
	validate_cache(config)?;
	validate_logging(config)?;

	Ok(())
}

fn validate_database(config: &StashConfig) -> Result<(), ConfigError> {
	if config.database.path.as_os_str().is_empty() {
		return Err(ConfigError::invalid_value(
			"database.path",
			"path cannot be empty",
		));
	}
	let basename = &config.database.sidecar_basename;
	if basename.is_empty() || basename.contains(['/', '\\']) {
		return Err(ConfigError::invalid_value(
			"database.sidecar_basename",
			"must be a plain file name",
		));
	}
	if config.database.password_env.is_empty() {
		return Err(ConfigError::invalid_value(
			"database.password_env",
			"variable name cannot be empty",
		));
	}
	Ok(())
}

fn validate_versioning(config: &StashConfig) -> Result<(), ConfigError> {
	let width = config.versioning.pad_width;
	if !(1..=MAX_PAD_WIDTH).contains(&width) {
		return Err(ConfigError::invalid_value(
			"versioning.pad_width",
			format!("must be between 1 and {MAX_PAD_WIDTH}, got {width}"),
		));
	}
	Ok(())
}

fn validate_cache(config: &StashConfig) -> Result<(), ConfigError> {
	if !config.cache.enabled {
		return Ok(());
	}
	if config.cache.ttl.is_zero() {
		return Err(ConfigError::invalid_value(
			"cache.ttl_secs",
			"must be positive when the cache is enabled",
		));
	}
	if config.cache.capacity == 0 {
		return Err(ConfigError::invalid_value(
			"cache.capacity",
			"must be positive when the cache is enabled",
		));
	}
	Ok(())
}

fn validate_logging(config: &StashConfig) -> Result<(), ConfigError> {
	let level = config.logging.level.to_ascii_lowercase();
	if !LOG_LEVELS.contains(&level.as_str()) {
		// RUST_LOG-style directives are passed through to the filter as is
		warn!(level = %config.logging.level, "log level is not a plain level name");
	}
	Ok(())
}
