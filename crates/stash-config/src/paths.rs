// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XDG Base Directory compliant path resolution.

use std::path::{Path, PathBuf};

use crate::ConfigError;

/// Resolved locations for Stash.
#[derive(Debug, Clone)]
pub struct StashPaths {
	/// ~/.config/stash/config.toml
	pub user_config_file: PathBuf,
	/// ~/.stash.toml, consulted when the XDG file is absent
	pub home_config_file: PathBuf,
	/// ~/.config/stash/stash.vault
	pub default_db_path: PathBuf,
}

impl StashPaths {
	/// Paths rooted at an explicit config home and home directory.
	pub fn rooted(config_home: &Path, home: &Path) -> Self {
		let dir = config_home.join("stash");
		Self {
			user_config_file: dir.join("config.toml"),
			home_config_file: home.join(".stash.toml"),
			default_db_path: dir.join("stash.vault"),
		}
	}

	/// Config files to try, in order. The first one that exists is used.
	pub fn config_candidates(&self) -> [&Path; 2] {
		[&self.user_config_file, &self.home_config_file]
	}
}

/// Resolve paths using XDG_CONFIG_HOME or ~/.config.
pub fn resolve_paths() -> Result<StashPaths, ConfigError> {
	let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.filter(|v| !v.is_empty())
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".config"));

	tracing::debug!(config_home = %config_home.display(), "resolved config home");
	Ok(StashPaths::rooted(&config_home, &home))
}
