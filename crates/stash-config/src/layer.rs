// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use serde::Deserialize;
use std::path::PathBuf;

/// Partial configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseLayer>,
	#[serde(default)]
	pub versioning: Option<VersioningLayer>,
	#[serde(default)]
	pub display: Option<DisplayLayer>,
	#[serde(default)]
	pub cache: Option<CacheLayer>,
	#[serde(default)]
	pub s3: Option<S3Layer>,
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseLayer {
	#[serde(default)]
	pub path: Option<PathBuf>,
	#[serde(default)]
	pub sidecar_basename: Option<String>,
	#[serde(default)]
	pub password_env: Option<String>,
	#[serde(default)]
	pub auto_bootstrap: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersioningLayer {
	#[serde(default)]
	pub pad_width: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayLayer {
	#[serde(default)]
	pub password_mask: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub ttl_secs: Option<u64>,
	#[serde(default)]
	pub capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Layer {
	#[serde(default)]
	pub region: Option<String>,
	#[serde(default)]
	pub addressing: Option<String>,
	#[serde(default)]
	pub signature_version: Option<String>,
	#[serde(default)]
	pub retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
}

impl ConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.database, other.database, DatabaseLayer::merge);
		merge_option(&mut self.versioning, other.versioning, |t, s| {
			overwrite(&mut t.pad_width, s.pad_width);
		});
		merge_option(&mut self.display, other.display, |t, s| {
			overwrite(&mut t.password_mask, s.password_mask);
		});
		merge_option(&mut self.cache, other.cache, CacheLayer::merge);
		merge_option(&mut self.s3, other.s3, S3Layer::merge);
		merge_option(&mut self.logging, other.logging, |t, s| {
			overwrite(&mut t.level, s.level);
		});
	}

	pub fn database_mut(&mut self) -> &mut DatabaseLayer {
		self.database.get_or_insert_with(DatabaseLayer::default)
	}

	pub fn cache_mut(&mut self) -> &mut CacheLayer {
		self.cache.get_or_insert_with(CacheLayer::default)
	}

	pub fn s3_mut(&mut self) -> &mut S3Layer {
		self.s3.get_or_insert_with(S3Layer::default)
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

fn overwrite<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}

impl DatabaseLayer {
	fn merge(&mut self, other: DatabaseLayer) {
		overwrite(&mut self.path, other.path);
		overwrite(&mut self.sidecar_basename, other.sidecar_basename);
		overwrite(&mut self.password_env, other.password_env);
		overwrite(&mut self.auto_bootstrap, other.auto_bootstrap);
	}
}

impl CacheLayer {
	fn merge(&mut self, other: CacheLayer) {
		overwrite(&mut self.enabled, other.enabled);
		overwrite(&mut self.ttl_secs, other.ttl_secs);
		overwrite(&mut self.capacity, other.capacity);
	}
}

impl S3Layer {
	fn merge(&mut self, other: S3Layer) {
		overwrite(&mut self.region, other.region);
		overwrite(&mut self.addressing, other.addressing);
		overwrite(&mut self.signature_version, other.signature_version);
		overwrite(&mut self.retries, other.retries);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_overlay_wins_and_keeps_unset_fields() {
		let mut base: ConfigLayer = toml::from_str(
			r#"
			[database]
			path = "/base/stash.vault"
			auto_bootstrap = false

			[cache]
			enabled = true
			ttl_secs = 60
			"#,
		)
		.unwrap();
		let overlay: ConfigLayer = toml::from_str(
			r#"
			[database]
			path = "/overlay/stash.vault"

			[cache]
			ttl_secs = 5
			"#,
		)
		.unwrap();

		base.merge(overlay);
		let db = base.database.unwrap();
		assert_eq!(db.path, Some(PathBuf::from("/overlay/stash.vault")));
		assert_eq!(db.auto_bootstrap, Some(false));
		let cache = base.cache.unwrap();
		assert_eq!(cache.enabled, Some(true));
		assert_eq!(cache.ttl_secs, Some(5));
	}

	#[test]
	fn test_merge_into_empty_adopts_sections() {
		let mut base = ConfigLayer::default();
		let mut overlay = ConfigLayer::default();
		overlay.s3_mut().region = Some("eu-west-1".into());
		base.merge(overlay);
		assert_eq!(base.s3.unwrap().region.as_deref(), Some("eu-west-1"));
	}

	#[test]
	fn test_unknown_section_is_rejected() {
		let result: Result<ConfigLayer, _> = toml::from_str("[providers]\nx = 1\n");
		assert!(result.is_err());
	}
}
