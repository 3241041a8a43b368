// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! First-run creation of a vault and its sidecar password file.
//!
//! The vault and the sidecar are created together or not at all. Finding
//! only one of them is an error that needs an operator; it is never
//! repaired automatically.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use stash_common_secret::SecretString;
use stash_vault::{VaultEngine, VaultHandle};
use tracing::{info, warn};

use crate::error::{StashError, StashResult};
use crate::password::{write_private_file, PasswordResolver};
use crate::sanitize::sanitize_message;

/// A vault created by bootstrap, already unlocked.
pub struct Bootstrapped {
	pub password: SecretString,
	pub handle: Box<dyn VaultHandle>,
}

impl std::fmt::Debug for Bootstrapped {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Bootstrapped")
			.field("password", &self.password)
			.field("entries", &self.handle.entries().len())
			.finish()
	}
}

#[derive(Debug, Clone)]
pub struct Bootstrapper {
	engine: Arc<dyn VaultEngine>,
}

impl Bootstrapper {
	pub fn new(engine: Arc<dyn VaultEngine>) -> Self {
		Self { engine }
	}

	/// Make sure a vault and its sidecar exist.
	///
	/// Returns `None` when both were already present, and the new unlocked
	/// vault when they had to be created.
	pub fn ensure_ready(
		&self,
		db_path: &Path,
		sidecar_path: &Path,
	) -> StashResult<Option<Bootstrapped>> {
		let database_exists = self.engine.exists(db_path);
		let sidecar_exists = sidecar_path.exists();

		match (database_exists, sidecar_exists) {
			(true, true) => {
				check_sidecar_permissions(sidecar_path);
				Ok(None)
			}
			(false, false) => self.create(db_path, sidecar_path).map(Some),
			_ => Err(StashError::BootstrapInconsistentState {
				database_exists,
				sidecar_exists,
			}),
		}
	}

	/// Delete any existing vault and sidecar, then bootstrap from scratch.
	///
	/// Destroys every stored credential. Only for explicit operator requests.
	pub fn force_reset(&self, db_path: &Path, sidecar_path: &Path) -> StashResult<Bootstrapped> {
		warn!(security = true, "force reset: deleting vault and sidecar password file");
		self.engine
			.remove(db_path)
			.map_err(|e| StashError::StoreWrite(sanitize_message(&e.to_string(), Some(db_path))))?;
		match fs::remove_file(sidecar_path) {
			Ok(()) => {}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
			Err(e) => return Err(StashError::io(sidecar_path, e)),
		}
		self.create(db_path, sidecar_path)
	}

	fn create(&self, db_path: &Path, sidecar_path: &Path) -> StashResult<Bootstrapped> {
		let password = PasswordResolver::generate();
		write_private_file(sidecar_path, &password)?;

		let handle = match self.engine.create_empty(db_path, &password) {
			Ok(handle) => handle,
			Err(e) => {
				if let Err(cleanup) = fs::remove_file(sidecar_path) {
					warn!(
						security = true,
						error = %cleanup,
						"failed to remove sidecar after vault creation failed"
					);
				}
				return Err(StashError::StoreWrite(sanitize_message(
					&e.to_string(),
					Some(db_path),
				)));
			}
		};

		info!("bootstrapped new vault and sidecar password file");
		Ok(Bootstrapped { password, handle })
	}
}

/// Warn when the sidecar is readable or writable by group or others.
/// Returns whether the permissions were too broad.
pub fn check_sidecar_permissions(sidecar_path: &Path) -> bool {
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;

		match fs::metadata(sidecar_path) {
			Ok(meta) => {
				let mode = meta.permissions().mode() & 0o777;
				if mode & 0o077 != 0 {
					warn!(
						security = true,
						mode = format!("{mode:o}"),
						"sidecar password file is accessible to other users; run chmod 600 on it"
					);
					return true;
				}
				false
			}
			Err(e) => {
				warn!(error = %e, "could not inspect sidecar password file permissions");
				false
			}
		}
	}
	#[cfg(not(unix))]
	{
		let _ = sidecar_path;
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use stash_vault::{EntryFields, FileVault, KdfParams, MemoryVault};
	use tempfile::TempDir;

	struct Paths {
		_dir: TempDir,
		db: std::path::PathBuf,
		sidecar: std::path::PathBuf,
	}

	fn paths() -> Paths {
		let dir = TempDir::new().unwrap();
		let db = dir.path().join("vault/stash.vault");
		let sidecar = dir.path().join("vault/.stash.txt");
		Paths {
			_dir: dir,
			db,
			sidecar,
		}
	}

	fn file_engine() -> Arc<dyn VaultEngine> {
		Arc::new(FileVault::with_kdf_params(KdfParams::minimal()))
	}

	#[test]
	fn test_creates_both_on_first_run() {
		let p = paths();
		let engine = file_engine();
		let boot = Bootstrapper::new(Arc::clone(&engine));
		let created = boot.ensure_ready(&p.db, &p.sidecar).unwrap().unwrap();

		assert!(p.db.exists());
		let sidecar = fs::read_to_string(&p.sidecar).unwrap();
		assert_eq!(sidecar, *created.password.expose());
		assert!(engine.open(&p.db, &created.password).is_ok());
	}

	#[test]
	fn test_idempotent() {
		let p = paths();
		let boot = Bootstrapper::new(file_engine());
		boot.ensure_ready(&p.db, &p.sidecar).unwrap();
		let db_before = fs::read(&p.db).unwrap();
		let sidecar_before = fs::read(&p.sidecar).unwrap();

		assert!(boot.ensure_ready(&p.db, &p.sidecar).unwrap().is_none());
		assert_eq!(fs::read(&p.db).unwrap(), db_before);
		assert_eq!(fs::read(&p.sidecar).unwrap(), sidecar_before);
	}

	#[test]
	fn test_database_without_sidecar_is_inconsistent() {
		let p = paths();
		let boot = Bootstrapper::new(file_engine());
		boot.ensure_ready(&p.db, &p.sidecar).unwrap();
		fs::remove_file(&p.sidecar).unwrap();

		let err = boot.ensure_ready(&p.db, &p.sidecar).unwrap_err();
		assert!(matches!(
			err,
			StashError::BootstrapInconsistentState {
				database_exists: true,
				sidecar_exists: false
			}
		));
		assert!(!p.sidecar.exists());
	}

	#[test]
	fn test_sidecar_without_database_is_inconsistent() {
		let p = paths();
		fs::create_dir_all(p.sidecar.parent().unwrap()).unwrap();
		fs::write(&p.sidecar, "orphan").unwrap();
		let boot = Bootstrapper::new(file_engine());
		let err = boot.ensure_ready(&p.db, &p.sidecar).unwrap_err();
		assert!(matches!(
			err,
			StashError::BootstrapInconsistentState {
				database_exists: false,
				sidecar_exists: true
			}
		));
		assert_eq!(fs::read_to_string(&p.sidecar).unwrap(), "orphan");
	}

	#[test]
	fn test_failed_creation_removes_sidecar() {
		let p = paths();
		let engine = MemoryVault::new();
		engine.set_fail_creates(true);
		let boot = Bootstrapper::new(Arc::new(engine.clone()));

		assert!(matches!(
			boot.ensure_ready(&p.db, &p.sidecar),
			Err(StashError::StoreWrite(_))
		));
		assert!(!p.sidecar.exists());
		assert!(!engine.exists(&p.db));
	}

	#[test]
	fn test_force_reset_replaces_everything() {
		let p = paths();
		let engine = file_engine();
		let boot = Bootstrapper::new(Arc::clone(&engine));
		let mut first = boot.ensure_ready(&p.db, &p.sidecar).unwrap().unwrap();
		first
			.handle
			.create_entry("a@@0000000001", EntryFields::default())
			.unwrap();
		first.handle.save().unwrap();

		let second = boot.force_reset(&p.db, &p.sidecar).unwrap();
		assert_ne!(first.password, second.password);
		assert!(engine.open(&p.db, &first.password).is_err());
		let reopened = engine.open(&p.db, &second.password).unwrap();
		assert!(reopened.entries().is_empty());
	}

	#[cfg(unix)]
	#[test]
	fn test_permission_warning_is_not_fatal() {
		use std::os::unix::fs::PermissionsExt;

		let p = paths();
		let boot = Bootstrapper::new(file_engine());
		boot.ensure_ready(&p.db, &p.sidecar).unwrap();
		assert!(!check_sidecar_permissions(&p.sidecar));

		fs::set_permissions(&p.sidecar, fs::Permissions::from_mode(0o644)).unwrap();
		assert!(check_sidecar_permissions(&p.sidecar));
		assert!(boot.ensure_ready(&p.db, &p.sidecar).unwrap().is_none());
	}
}
