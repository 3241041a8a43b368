// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Master password resolution and sidecar password files.
//!
//! Sources are tried in order: an explicit password, the sidecar file next
//! to the vault, then an environment variable.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use stash_common_secret::SecretString;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::{StashError, StashResult};

pub const DEFAULT_PASSWORD_ENV: &str = "STASH_PASSWORD";
pub const DEFAULT_SIDECAR_BASENAME: &str = ".stash.txt";

/// Random bytes behind a generated password (256 bits).
pub const GENERATED_PASSWORD_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordSource {
	Explicit,
	Sidecar,
	Environment,
}

impl std::fmt::Display for PasswordSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Explicit => write!(f, "explicit"),
			Self::Sidecar => write!(f, "sidecar"),
			Self::Environment => write!(f, "environment"),
		}
	}
}

/// Sidecar path for a vault: `basename` in the vault's directory.
pub fn sidecar_path_for(db_path: &Path, basename: &str) -> PathBuf {
	match db_path.parent() {
		Some(dir) if !dir.as_os_str().is_empty() => dir.join(basename),
		_ => PathBuf::from(basename),
	}
}

#[derive(Debug, Clone)]
pub struct PasswordResolver {
	sidecar_path: PathBuf,
	env_var: String,
}

impl PasswordResolver {
	pub fn new(sidecar_path: impl Into<PathBuf>, env_var: impl Into<String>) -> Self {
		Self {
			sidecar_path: sidecar_path.into(),
			env_var: env_var.into(),
		}
	}

	pub fn sidecar_path(&self) -> &Path {
		&self.sidecar_path
	}

	pub fn env_var(&self) -> &str {
		&self.env_var
	}

	/// Whether the password environment variable holds a non-empty value.
	pub fn env_is_set(&self) -> bool {
		self.from_env().is_some()
	}

	/// Resolve the master password or fail with
	/// [`StashError::PasswordUnavailable`].
	pub fn resolve(
		&self,
		explicit: Option<&SecretString>,
	) -> StashResult<(SecretString, PasswordSource)> {
		if let Some(password) = explicit.filter(|p| !p.expose().is_empty()) {
			return Ok((password.clone(), PasswordSource::Explicit));
		}
		if let Some(password) = self.read_sidecar() {
			return Ok((password, PasswordSource::Sidecar));
		}
		if let Some(password) = self.from_env() {
			return Ok((password, PasswordSource::Environment));
		}
		Err(StashError::PasswordUnavailable(format!(
			"no explicit password, no readable sidecar file, and {} is not set",
			self.env_var
		)))
	}

	/// Sidecar contents, trimmed. `None` when missing, unreadable or blank.
	pub fn read_sidecar(&self) -> Option<SecretString> {
		match fs::read_to_string(&self.sidecar_path) {
			Ok(content) => {
				let content = Zeroizing::new(content);
				let trimmed = content.trim();
				if trimmed.is_empty() {
					warn!("sidecar password file is empty, ignoring");
					None
				} else {
					Some(SecretString::new(trimmed.to_string()))
				}
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
			Err(e) => {
				warn!(error = %e, "sidecar password file unreadable, ignoring");
				None
			}
		}
	}

	fn from_env(&self) -> Option<SecretString> {
		std::env::var(&self.env_var)
			.ok()
			.filter(|v| !v.is_empty())
			.map(SecretString::new)
	}

	/// Generate a strong random password.
	pub fn generate() -> SecretString {
		let mut bytes = Zeroizing::new([0u8; GENERATED_PASSWORD_BYTES]);
		OsRng.fill_bytes(bytes.as_mut());
		SecretString::new(URL_SAFE_NO_PAD.encode(bytes.as_ref()))
	}

	/// Generate a password and write it to the sidecar with owner-only
	/// permissions.
	pub fn generate_and_persist(&self) -> StashResult<SecretString> {
		let password = Self::generate();
		write_private_file(&self.sidecar_path, &password)?;
		debug!("generated sidecar password file");
		Ok(password)
	}
}

/// Write a secret to `path` with mode 0600, creating the parent directory
/// with mode 0700 if needed.
pub fn write_private_file(path: &Path, secret: &SecretString) -> StashResult<()> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		if !parent.exists() {
			fs::create_dir_all(parent).map_err(|e| StashError::io(parent, e))?;
			#[cfg(unix)]
			{
				use std::os::unix::fs::PermissionsExt;
				if let Err(e) = fs::set_permissions(parent, fs::Permissions::from_mode(0o700)) {
					warn!(error = %e, "could not restrict vault directory permissions");
				}
			}
		}
	}

	let mut options = fs::OpenOptions::new();
	options.write(true).create(true).truncate(true);
	#[cfg(unix)]
	{
		use std::os::unix::fs::OpenOptionsExt;
		options.mode(0o600);
	}
	let mut file = options.open(path).map_err(|e| StashError::io(path, e))?;
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		file.set_permissions(fs::Permissions::from_mode(0o600))
			.map_err(|e| StashError::io(path, e))?;
	}
	file.write_all(secret.expose().as_bytes())
		.and_then(|()| file.sync_all())
		.map_err(|e| StashError::io(path, e))
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn resolver(dir: &TempDir, env_var: &str) -> PasswordResolver {
		PasswordResolver::new(dir.path().join(DEFAULT_SIDECAR_BASENAME), env_var)
	}

	#[test]
	fn test_explicit_wins() {
		let dir = TempDir::new().unwrap();
		let r = resolver(&dir, "STASH_TEST_PW_EXPLICIT_1");
		fs::write(r.sidecar_path(), "from-sidecar").unwrap();
		let (pw, source) = r.resolve(Some(&SecretString::from("given"))).unwrap();
		assert_eq!(pw.expose(), "given");
		assert_eq!(source, PasswordSource::Explicit);
	}

	#[test]
	fn test_empty_explicit_falls_through_to_sidecar() {
		let dir = TempDir::new().unwrap();
		let r = resolver(&dir, "STASH_TEST_PW_SIDECAR_2");
		fs::write(r.sidecar_path(), "  from-sidecar\n").unwrap();
		let (pw, source) = r.resolve(Some(&SecretString::from(""))).unwrap();
		assert_eq!(pw.expose(), "from-sidecar");
		assert_eq!(source, PasswordSource::Sidecar);
	}

	#[test]
	fn test_env_used_when_no_sidecar() {
		let dir = TempDir::new().unwrap();
		let var = "STASH_TEST_PW_ENV_3";
		std::env::set_var(var, "from-env");
		let r = resolver(&dir, var);
		let (pw, source) = r.resolve(None).unwrap();
		assert_eq!(pw.expose(), "from-env");
		assert_eq!(source, PasswordSource::Environment);
		std::env::remove_var(var);
	}

	#[test]
	fn test_blank_sidecar_is_ignored() {
		let dir = TempDir::new().unwrap();
		let r = resolver(&dir, "STASH_TEST_PW_BLANK_4");
		fs::write(r.sidecar_path(), "\n").unwrap();
		assert!(r.read_sidecar().is_none());
	}

	#[test]
	fn test_nothing_available() {
		let dir = TempDir::new().unwrap();
		let r = resolver(&dir, "STASH_TEST_PW_NONE_5");
		std::env::remove_var("STASH_TEST_PW_NONE_5");
		assert!(matches!(
			r.resolve(None),
			Err(StashError::PasswordUnavailable(_))
		));
	}

	#[test]
	fn test_generated_passwords_are_strong_and_distinct() {
		let a = PasswordResolver::generate();
		let b = PasswordResolver::generate();
		assert_ne!(a, b);
		// 32 bytes, unpadded URL-safe base64.
		assert_eq!(a.expose().len(), 43);
		assert!(a
			.expose()
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
	}

	#[test]
	fn test_generate_and_persist_roundtrip() {
		let dir = TempDir::new().unwrap();
		let r = PasswordResolver::new(dir.path().join("nested/.stash.txt"), "UNUSED_VAR_6");
		let pw = r.generate_and_persist().unwrap();
		assert_eq!(r.read_sidecar().unwrap(), pw);
	}

	#[cfg(unix)]
	#[test]
	fn test_persisted_sidecar_is_owner_only() {
		use std::os::unix::fs::PermissionsExt;

		let dir = TempDir::new().unwrap();
		let r = PasswordResolver::new(dir.path().join("vault/.stash.txt"), "UNUSED_VAR_7");
		r.generate_and_persist().unwrap();
		let mode = fs::metadata(r.sidecar_path()).unwrap().permissions().mode();
		assert_eq!(mode & 0o777, 0o600);
		let dir_mode = fs::metadata(dir.path().join("vault")).unwrap().permissions().mode();
		assert_eq!(dir_mode & 0o777, 0o700);
	}

	#[cfg(target_os = "linux")]
	#[test]
	fn test_write_into_unwritable_parent_fails() {
		let r = PasswordResolver::new("/proc/stash-test/.stash.txt", "UNUSED_VAR_8");
		assert!(matches!(
			r.generate_and_persist(),
			Err(StashError::Io { .. })
		));
	}

	#[test]
	fn test_sidecar_path_for() {
		assert_eq!(
			sidecar_path_for(Path::new("/a/b/stash.vault"), ".stash.txt"),
			PathBuf::from("/a/b/.stash.txt")
		);
		assert_eq!(
			sidecar_path_for(Path::new("stash.vault"), ".stash.txt"),
			PathBuf::from(".stash.txt")
		);
	}
}
