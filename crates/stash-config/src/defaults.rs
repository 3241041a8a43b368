// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example configuration file generation.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::ConfigError;

/// Commented example configuration. Every setting is shown at its default.
pub const EXAMPLE_CONFIG_TEMPLATE: &str = r#"#
# Stash Configuration File
# Location: ~/.config/stash/config.toml (or ~/.stash.toml)
#
# Every value below is the built-in default. Environment variables
# (STASH_*) override this file, and command-line flags override both.
#

# =============================================================================
# Database
# =============================================================================

[database]
# Encrypted vault file. Defaults to ~/.config/stash/stash.vault
# path = "/home/me/.config/stash/stash.vault"

# Name of the sidecar password file kept beside the vault
sidecar_basename = ".stash.txt"

# Environment variable consulted for the master password
password_env = "STASH_PASSWORD"

# Create the vault and sidecar on first use when no password is supplied
auto_bootstrap = true

# =============================================================================
# Versioning
# =============================================================================

[versioning]
# Digits in the zero-padded version suffix (1-20). Changing this makes
# existing entries invisible.
pad_width = 10

# =============================================================================
# Display
# =============================================================================

[display]
# Shown in place of secrets unless --show-password is given
password_mask = "*****"

# =============================================================================
# Cache
# =============================================================================

[cache]
enabled = false
ttl_secs = 300
capacity = 256

# =============================================================================
# S3 client defaults
# =============================================================================

[s3]
region = "us-east-1"
# path or virtual
addressing = "path"
signature_version = "s3v4"
retries = 10

# =============================================================================
# Logging
# =============================================================================

[logging]
# error, warn, info, debug, trace
level = "warn"
"#;

/// Write the example configuration to `path`.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn write_example_config(path: &Path, force: bool) -> Result<(), ConfigError> {
	if path.exists() && !force {
		return Err(ConfigError::FileExists(path.to_path_buf()));
	}

	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		if !parent.exists() {
			debug!(path = %parent.display(), "creating config directory");
			fs::create_dir_all(parent)?;
		}
	}

	info!(path = %path.display(), "writing example config file");
	fs::write(path, EXAMPLE_CONFIG_TEMPLATE)?;
	Ok(())
}
