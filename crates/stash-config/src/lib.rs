// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for Stash.
//!
//! This crate provides:
//! - XDG Base Directory compliant path resolution
//! - Layered configuration: defaults < TOML file < `STASH_*` environment < CLI
//! - Configuration validation
//! - An example config file writer

pub mod defaults;
pub mod error;
pub mod layer;
pub mod paths;
pub mod registry;
pub mod runtime;
pub mod sources;
pub mod validation;

pub use defaults::{write_example_config, EXAMPLE_CONFIG_TEMPLATE};
pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use paths::{resolve_paths, StashPaths};
pub use registry::ConfigRegistry;
pub use runtime::StashConfig;
pub use sources::{CliOverrides, ConfigSource, Precedence};

/// Load configuration from defaults, the first config file found and the
/// environment.
pub fn load_config() -> Result<StashConfig, ConfigError> {
	load_config_with_cli(CliOverrides::default())
}

/// Load configuration with CLI overrides on top.
///
/// `cli.config_file`, when set, replaces the config file search and must
/// exist.
pub fn load_config_with_cli(cli: CliOverrides) -> Result<StashConfig, ConfigError> {
	let paths = paths::resolve_paths()?;
	let mut registry = ConfigRegistry::new();

	registry.register(Box::new(sources::DefaultsSource));
	match &cli.config_file {
		Some(path) => registry.register(Box::new(sources::FileSource::explicit(path.clone()))),
		None => registry.register(Box::new(sources::FileSource::search(
			paths.config_candidates().map(|p| p.to_path_buf()),
		))),
	}
	registry.register(Box::new(sources::EnvSource::new()));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load(&paths)
}
