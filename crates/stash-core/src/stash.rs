// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The [`Stash`] façade used by the CLI and the server.
//!
//! A `Stash` resolves the master password, bootstraps a new vault when that
//! applies, and owns the single open handle through its [`EntryManager`].
//! Nothing happens until the first operation.
//!
//! # Concurrency
//!
//! `Stash` is `Send` but every operation takes `&mut self`. To share one
//! instance between threads, put it behind a `Mutex`. Separate processes
//! writing the same vault file are not coordinated: the last save wins.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stash_common_secret::SecretString;
use stash_vault::VaultEngine;
use tracing::{debug, info, warn};

use crate::bootstrap::{Bootstrapped, Bootstrapper};
use crate::builders::{self, BuildError, DbUrlOptions, S3ClientConfig, S3Options};
use crate::cache::CacheSettings;
use crate::codec::{VersionCodec, DEFAULT_PAD_WIDTH};
use crate::credential::{CredentialInput, CredentialResult, DEFAULT_PASSWORD_MASK};
use crate::entries::{EntryManager, PutOutcome};
use crate::error::{StashError, StashResult};
use crate::password::{
	sidecar_path_for, write_private_file, PasswordResolver, DEFAULT_PASSWORD_ENV,
	DEFAULT_SIDECAR_BASENAME,
};
use crate::store::CredentialStore;

/// How a [`Stash`] finds and unlocks its vault.
#[derive(Debug, Clone)]
pub struct StashOptions {
	pub db_path: PathBuf,
	/// Explicit master password. Takes priority over the sidecar and the
	/// environment, and disables bootstrap.
	pub password: Option<SecretString>,
	pub sidecar_basename: String,
	pub password_env: String,
	pub auto_bootstrap: bool,
	pub pad_width: usize,
	pub password_mask: String,
	/// `None` disables the entry cache.
	pub cache: Option<CacheSettings>,
}

impl StashOptions {
	pub fn new(db_path: impl Into<PathBuf>) -> Self {
		Self {
			db_path: db_path.into(),
			password: None,
			sidecar_basename: DEFAULT_SIDECAR_BASENAME.to_string(),
			password_env: DEFAULT_PASSWORD_ENV.to_string(),
			auto_bootstrap: true,
			pad_width: DEFAULT_PAD_WIDTH,
			password_mask: DEFAULT_PASSWORD_MASK.to_string(),
			cache: None,
		}
	}

	pub fn with_password(mut self, password: impl Into<SecretString>) -> Self {
		self.password = Some(password.into());
		self
	}

	pub fn with_cache(mut self, settings: CacheSettings) -> Self {
		self.cache = Some(settings);
		self
	}

	pub fn with_password_env(mut self, var: impl Into<String>) -> Self {
		self.password_env = var.into();
		self
	}

	pub fn sidecar_path(&self) -> PathBuf {
		sidecar_path_for(&self.db_path, &self.sidecar_basename)
	}

	fn explicit_password(&self) -> Option<&SecretString> {
		self.password.as_ref().filter(|p| !p.expose().is_empty())
	}
}

/// What `setup` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
	Created,
	AlreadyReady,
}

#[derive(Debug)]
pub struct Stash {
	engine: Arc<dyn VaultEngine>,
	options: StashOptions,
	manager: Option<EntryManager>,
}

impl Stash {
	pub fn new(engine: Arc<dyn VaultEngine>, options: StashOptions) -> Self {
		Self {
			engine,
			options,
			manager: None,
		}
	}

	pub fn options(&self) -> &StashOptions {
		&self.options
	}

	pub fn sidecar_path(&self) -> PathBuf {
		self.options.sidecar_path()
	}

	/// The underlying store, if an operation has connected it already.
	pub fn store(&self) -> Option<&CredentialStore> {
		self.manager.as_ref().map(EntryManager::store)
	}

	/// Store a new version of `name` and return the version written.
	pub fn put(
		&mut self,
		name: &str,
		input: CredentialInput,
		version: Option<u64>,
	) -> StashResult<u64> {
		self.put_outcome(name, input, version).map(|o| o.version)
	}

	pub fn put_outcome(
		&mut self,
		name: &str,
		input: CredentialInput,
		version: Option<u64>,
	) -> StashResult<PutOutcome> {
		self.manager()?.put(name, input, version)
	}

	pub fn get(
		&mut self,
		name: &str,
		version: Option<u64>,
		show_password: bool,
	) -> StashResult<Option<CredentialResult>> {
		self.manager()?.get(name, version, show_password)
	}

	pub fn list(
		&mut self,
		prefix: Option<&str>,
		show_password: bool,
	) -> StashResult<Vec<CredentialResult>> {
		self.manager()?.list(prefix, show_password)
	}

	pub fn keys(&mut self, prefix: Option<&str>) -> StashResult<Vec<String>> {
		self.manager()?.keys(prefix)
	}

	pub fn delete(&mut self, name: &str) -> StashResult<bool> {
		self.manager()?.delete(name)
	}

	pub fn versions(&mut self, name: &str) -> StashResult<Vec<u64>> {
		self.manager()?.versions(name)
	}

	pub fn db_url(&mut self, name: &str, options: &DbUrlOptions) -> Result<String, BuildError> {
		builders::build_db_url(self, name, options)
	}

	pub fn s3_config(
		&mut self,
		name: &str,
		options: &S3Options,
	) -> Result<S3ClientConfig, BuildError> {
		builders::build_s3_config(self, name, options)
	}

	/// Bootstrap explicitly. With `force`, any existing vault and sidecar are
	/// destroyed first.
	pub fn setup(&mut self, force: bool) -> StashResult<SetupOutcome> {
		self.close();
		let sidecar = self.sidecar_path();
		let bootstrapper = Bootstrapper::new(Arc::clone(&self.engine));

		let created = if force {
			Some(bootstrapper.force_reset(&self.options.db_path, &sidecar)?)
		} else {
			bootstrapper.ensure_ready(&self.options.db_path, &sidecar)?
		};

		match created {
			Some(bootstrapped) => {
				self.manager = Some(self.adopt(bootstrapped)?);
				Ok(SetupOutcome::Created)
			}
			None => Ok(SetupOutcome::AlreadyReady),
		}
	}

	/// Replace the master password with a freshly generated one and store it
	/// in the sidecar.
	///
	/// The new password is staged in `<sidecar>.new` until the re-keyed vault
	/// has been saved. If the save fails the vault keeps its old password.
	pub fn rotate_password(&mut self) -> StashResult<()> {
		let sidecar = self.sidecar_path();
		let staged = staged_path(&sidecar);
		let store = self.manager()?.store_mut();
		store.open()?;
		let previous = store.password().clone();

		let password = PasswordResolver::generate();
		write_private_file(&staged, &password)?;

		if let Err(e) = store.change_password(password).and_then(|()| store.save()) {
			if let Err(revert) = store.change_password(previous) {
				warn!(error = %revert, "failed to restore previous master password in memory");
			}
			remove_quietly(&staged);
			return Err(e);
		}

		fs::rename(&staged, &sidecar).map_err(|e| {
			warn!(
				security = true,
				"vault re-keyed but sidecar not replaced; the new password is in the staged file"
			);
			StashError::io(&sidecar, e)
		})?;
		info!("rotated master password");
		Ok(())
	}

	/// Release the vault handle. The next operation reconnects.
	pub fn close(&mut self) {
		if let Some(mut manager) = self.manager.take() {
			manager.store_mut().close();
		}
	}

	fn manager(&mut self) -> StashResult<&mut EntryManager> {
		if self.manager.is_none() {
			let manager = self.connect()?;
			self.manager = Some(manager);
		}
		self.manager
			.as_mut()
			.ok_or_else(|| StashError::StoreUnavailable("credential store not connected".to_string()))
	}

	fn connect(&self) -> StashResult<EntryManager> {
		let sidecar = self.sidecar_path();
		let resolver = PasswordResolver::new(&sidecar, &self.options.password_env);
		let explicit = self.options.explicit_password();

		if explicit.is_none() && !resolver.env_is_set() && self.options.auto_bootstrap {
			let bootstrapper = Bootstrapper::new(Arc::clone(&self.engine));
			if let Some(bootstrapped) = bootstrapper.ensure_ready(&self.options.db_path, &sidecar)? {
				return self.adopt(bootstrapped);
			}
		}

		let (password, source) = resolver.resolve(explicit)?;
		debug!(source = %source, "resolved master password");
		Ok(EntryManager::new(
			self.new_store(password)?,
			&self.options.password_mask,
		))
	}

	fn adopt(&self, bootstrapped: Bootstrapped) -> StashResult<EntryManager> {
		let store = self
			.new_store(bootstrapped.password)?
			.with_handle(bootstrapped.handle);
		Ok(EntryManager::new(store, &self.options.password_mask))
	}

	fn new_store(&self, password: SecretString) -> StashResult<CredentialStore> {
		Ok(CredentialStore::new(
			Arc::clone(&self.engine),
			&self.options.db_path,
			password,
			VersionCodec::new(self.options.pad_width)?,
			self.options.cache,
		))
	}
}

fn staged_path(sidecar: &Path) -> PathBuf {
	let mut staged = sidecar.as_os_str().to_owned();
	staged.push(".new");
	PathBuf::from(staged)
}

fn remove_quietly(path: &Path) {
	if let Err(e) = fs::remove_file(path) {
		if e.kind() != std::io::ErrorKind::NotFound {
			warn!(security = true, error = %e, "failed to remove staged password file");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use stash_vault::{FileVault, KdfParams, MemoryVault};
	use tempfile::TempDir;

	fn file_stash(dir: &TempDir) -> Stash {
		let options = StashOptions::new(dir.path().join("stash.vault"))
			.with_password_env("STASH_TEST_UNSET_PASSWORD_ENV");
		Stash::new(
			Arc::new(FileVault::with_kdf_params(KdfParams::minimal())),
			options,
		)
	}

	#[test]
	fn test_first_use_bootstraps() {
		let dir = TempDir::new().unwrap();
		let mut stash = file_stash(&dir);
		assert_eq!(stash.put("api-token", CredentialInput::value("sk-123"), None).unwrap(), 1);
		assert!(dir.path().join("stash.vault").exists());
		assert!(dir.path().join(".stash.txt").exists());

		stash.close();
		let mut again = file_stash(&dir);
		let result = again.get("api-token", None, true).unwrap().unwrap();
		assert_eq!(result.secret(), Some("sk-123"));
	}

	#[test]
	fn test_explicit_password_skips_bootstrap() {
		let dir = TempDir::new().unwrap();
		let options = StashOptions::new(dir.path().join("stash.vault")).with_password("given");
		let mut stash = Stash::new(Arc::new(MemoryVault::new()), options);
		assert!(matches!(
			stash.list(None, false),
			Err(StashError::StoreUnavailable(_))
		));
		assert!(!dir.path().join(".stash.txt").exists());
	}

	#[test]
	fn test_no_bootstrap_and_no_password() {
		let dir = TempDir::new().unwrap();
		let mut options = StashOptions::new(dir.path().join("stash.vault"))
			.with_password_env("STASH_TEST_UNSET_PASSWORD_ENV");
		options.auto_bootstrap = false;
		let mut stash = Stash::new(Arc::new(MemoryVault::new()), options);
		assert!(matches!(
			stash.keys(None),
			Err(StashError::PasswordUnavailable(_))
		));
	}

	#[test]
	fn test_inconsistent_state_surfaces() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join(".stash.txt"), "orphan").unwrap();
		let mut stash = file_stash(&dir);
		assert!(matches!(
			stash.versions("x"),
			Err(StashError::BootstrapInconsistentState { .. })
		));
	}

	#[test]
	fn test_setup_is_idempotent_and_force_resets() {
		let dir = TempDir::new().unwrap();
		let mut stash = file_stash(&dir);
		assert_eq!(stash.setup(false).unwrap(), SetupOutcome::Created);
		stash.put("n", CredentialInput::value("v"), None).unwrap();
		assert_eq!(stash.setup(false).unwrap(), SetupOutcome::AlreadyReady);
		assert_eq!(stash.versions("n").unwrap(), vec![1]);

		assert_eq!(stash.setup(true).unwrap(), SetupOutcome::Created);
		assert!(stash.versions("n").unwrap().is_empty());
	}

	#[test]
	fn test_rotate_password() {
		let dir = TempDir::new().unwrap();
		let mut stash = file_stash(&dir);
		stash.put("n", CredentialInput::value("v"), None).unwrap();
		let before = fs::read_to_string(stash.sidecar_path()).unwrap();

		stash.rotate_password().unwrap();
		let after = fs::read_to_string(stash.sidecar_path()).unwrap();
		assert_ne!(before, after);
		assert!(!staged_path(&stash.sidecar_path()).exists());

		stash.close();
		let mut reopened = file_stash(&dir);
		assert_eq!(
			reopened.get("n", None, true).unwrap().unwrap().secret(),
			Some("v")
		);
	}

	#[test]
	fn test_rotate_password_failure_keeps_old_sidecar() {
		let dir = TempDir::new().unwrap();
		let engine = MemoryVault::new();
		let options = StashOptions::new(dir.path().join("stash.vault"))
			.with_password_env("STASH_TEST_UNSET_PASSWORD_ENV");
		let mut stash = Stash::new(Arc::new(engine.clone()), options);
		stash.put("n", CredentialInput::value("v"), None).unwrap();
		let before = fs::read_to_string(stash.sidecar_path()).unwrap();

		engine.set_fail_saves(true);
		assert!(matches!(
			stash.rotate_password(),
			Err(StashError::StoreWrite(_))
		));
		assert_eq!(fs::read_to_string(stash.sidecar_path()).unwrap(), before);
		assert!(!staged_path(&stash.sidecar_path()).exists());

		engine.set_fail_saves(false);
		stash.close();
		assert_eq!(stash.versions("n").unwrap(), vec![1]);
	}

	#[test]
	fn test_close_releases_handle() {
		let dir = TempDir::new().unwrap();
		let mut stash = file_stash(&dir);
		stash.keys(None).unwrap();
		assert!(stash.store().is_some_and(CredentialStore::is_open));
		stash.close();
		assert!(stash.store().is_none());
	}

	#[test]
	fn test_invalid_pad_width_is_reported() {
		let dir = TempDir::new().unwrap();
		let mut options = StashOptions::new(dir.path().join("stash.vault")).with_password("pw");
		options.pad_width = 0;
		let mut stash = Stash::new(Arc::new(MemoryVault::new()), options);
		assert!(matches!(
			stash.keys(None),
			Err(StashError::InvalidField { .. })
		));
	}
}
