// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI, defaults.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::layer::*;
use crate::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 30,
	Environment = 50,
	Cli = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	/// Precedence level
	fn precedence(&self) -> Precedence;

	/// Load configuration layer from this source
	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading defaults");
		// Defaults are applied in StashConfig::from_layer
		Ok(ConfigLayer::default())
	}
}

/// TOML config file source.
///
/// Searched candidates are skipped when missing and the first existing one is
/// read. An explicit path must exist.
pub struct FileSource {
	candidates: Vec<PathBuf>,
	required: bool,
}

impl FileSource {
	/// First existing file among `candidates`, or nothing.
	pub fn search(candidates: impl IntoIterator<Item = PathBuf>) -> Self {
		Self {
			candidates: candidates.into_iter().collect(),
			required: false,
		}
	}

	/// A file named on the command line.
	pub fn explicit(path: PathBuf) -> Self {
		Self {
			candidates: vec![path],
			required: true,
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		"config-file"
	}
	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		let Some(path) = self.candidates.iter().find(|p| p.is_file()) else {
			if self.required {
				if let Some(path) = self.candidates.first() {
					return Err(ConfigError::FileNotFound(path.clone()));
				}
			}
			debug!(candidates = self.candidates.len(), "no config file found, skipping");
			return Ok(ConfigLayer::default());
		};

		debug!(path = %path.display(), "loading config file");
		let content = std::fs::read_to_string(path)?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: path.clone(),
			source: e,
		})?;

		trace!("parsed config layer");
		Ok(layer)
	}
}

/// Environment variable source: `STASH_*` settings.
pub struct EnvSource {
	vars: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Read the process environment at load time.
	pub fn new() -> Self {
		Self { vars: None }
	}

	/// Use a fixed set of variables instead of the process environment.
	pub fn with_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
		Self {
			vars: Some(vars.into_iter().collect()),
		}
	}

	fn vars(&self) -> Vec<(String, String)> {
		match &self.vars {
			Some(vars) => vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
			None => std::env::vars().collect(),
		}
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		let mut layer = ConfigLayer::default();

		for (key, value) in self.vars() {
			if !key.starts_with("STASH_") {
				continue;
			}
			let value = value.trim().to_string();
			if value.is_empty() {
				continue;
			}

			trace!(key = %key, "processing env var");

			match key.as_str() {
				"STASH_DB_PATH" => layer.database_mut().path = Some(PathBuf::from(value)),
				"STASH_SIDECAR_BASENAME" => layer.database_mut().sidecar_basename = Some(value),
				"STASH_PASSWORD_ENV" => layer.database_mut().password_env = Some(value),
				"STASH_AUTO_BOOTSTRAP" => {
					layer.database_mut().auto_bootstrap = Some(parse_bool(&key, &value)?);
				}
				"STASH_VERSION_PAD_WIDTH" => {
					layer
						.versioning
						.get_or_insert_with(VersioningLayer::default)
						.pad_width = Some(parse_number(&key, &value)?);
				}
				"STASH_PASSWORD_MASK" => {
					layer
						.display
						.get_or_insert_with(DisplayLayer::default)
						.password_mask = Some(value);
				}
				"STASH_ENABLE_CACHE" => layer.cache_mut().enabled = Some(parse_bool(&key, &value)?),
				"STASH_CACHE_TTL" => layer.cache_mut().ttl_secs = Some(parse_number(&key, &value)?),
				"STASH_CACHE_CAPACITY" => {
					layer.cache_mut().capacity = Some(parse_number(&key, &value)?);
				}
				"STASH_S3_REGION" => layer.s3_mut().region = Some(value),
				"STASH_S3_ADDRESSING" => layer.s3_mut().addressing = Some(value),
				"STASH_S3_SIGNATURE_VERSION" => layer.s3_mut().signature_version = Some(value),
				"STASH_S3_RETRIES" => layer.s3_mut().retries = Some(parse_number(&key, &value)?),
				"STASH_LOG_LEVEL" => {
					layer
						.logging
						.get_or_insert_with(LoggingLayer::default)
						.level = Some(value);
				}
				_ => {
					// Secrets and server settings are read by their consumers
				}
			}
		}

		Ok(layer)
	}
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(ConfigError::invalid_value(
			key,
			format!("expected a boolean, got '{value}'"),
		)),
	}
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
	value.parse().map_err(|_| {
		ConfigError::invalid_value(key, format!("expected a non-negative integer, got '{value}'"))
	})
}

/// CLI override source.
pub struct CliSource {
	overrides: CliOverrides,
}

/// CLI argument overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub db_path: Option<PathBuf>,
	pub log_level: Option<String>,
	pub config_file: Option<PathBuf>,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let mut layer = ConfigLayer::default();

		if let Some(ref path) = self.overrides.db_path {
			layer.database_mut().path = Some(path.clone());
		}

		if let Some(ref level) = self.overrides.log_level {
			layer
				.logging
				.get_or_insert_with(LoggingLayer::default)
				.level = Some(level.clone());
		}

		Ok(layer)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn env(pairs: &[(&str, &str)]) -> EnvSource {
		EnvSource::with_vars(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
	}

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Cli > Precedence::Environment);
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_file_source_missing_candidates_returns_empty() {
		let source = FileSource::search([PathBuf::from("/nonexistent/config.toml")]);
		let layer = source.load().unwrap();
		assert!(layer.database.is_none());
	}

	#[test]
	fn test_explicit_missing_file_is_an_error() {
		let source = FileSource::explicit(PathBuf::from("/nonexistent/config.toml"));
		assert!(matches!(source.load(), Err(ConfigError::FileNotFound(_))));
	}

	#[test]
	fn test_first_existing_candidate_wins() {
		let dir = TempDir::new().unwrap();
		let first = dir.path().join("a.toml");
		let second = dir.path().join("b.toml");
		std::fs::write(&second, "[display]\npassword_mask = \"b\"\n").unwrap();
		let source = FileSource::search([first.clone(), second.clone()]);
		let mask = |l: ConfigLayer| l.display.unwrap().password_mask.unwrap();
		assert_eq!(mask(source.load().unwrap()), "b");

		std::fs::write(&first, "[display]\npassword_mask = \"a\"\n").unwrap();
		assert_eq!(mask(source.load().unwrap()), "a");
	}

	#[test]
	fn test_malformed_file_reports_path() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, "[cache\n").unwrap();
		let err = FileSource::explicit(path.clone()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { path: ref p, .. } if *p == path));
	}

	#[test]
	fn test_env_source_maps_variables() {
		let layer = env(&[
			("STASH_DB_PATH", "/data/stash.vault"),
			("STASH_AUTO_BOOTSTRAP", "no"),
			("STASH_ENABLE_CACHE", "TRUE"),
			("STASH_CACHE_TTL", " 42 "),
			("STASH_S3_RETRIES", "3"),
			("STASH_PASSWORD", "ignored"),
			("OTHER_VAR", "x"),
		])
		.load()
		.unwrap();
		let db = layer.database.unwrap();
		assert_eq!(db.path, Some(PathBuf::from("/data/stash.vault")));
		assert_eq!(db.auto_bootstrap, Some(false));
		let cache = layer.cache.unwrap();
		assert_eq!(cache.enabled, Some(true));
		assert_eq!(cache.ttl_secs, Some(42));
		assert_eq!(layer.s3.unwrap().retries, Some(3));
	}

	#[test]
	fn test_env_source_rejects_bad_numbers() {
		let err = env(&[("STASH_CACHE_TTL", "soon")]).load().unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "STASH_CACHE_TTL"));
		assert!(env(&[("STASH_VERSION_PAD_WIDTH", "-1")]).load().is_err());
		assert!(env(&[("STASH_ENABLE_CACHE", "maybe")]).load().is_err());
	}

	#[test]
	fn test_blank_env_values_are_ignored() {
		let layer = env(&[("STASH_CACHE_TTL", "  ")]).load().unwrap();
		assert!(layer.cache.is_none());
	}
}
