// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Vault engines for Stash.
//!
//! A vault is one encrypted container holding a flat list of [`Entry`]
//! records, all living in a single implicit group. Callers interact with it
//! through two traits:
//!
//! - [`VaultEngine`] knows how to open, create and remove vaults at a path
//! - [`VaultHandle`] is an unlocked vault: entry CRUD, re-keying and `save`
//!
//! Two engines ship with the crate:
//!
//! - [`FileVault`]: Argon2id-derived key, AES-256-GCM payload, one JSON
//!   envelope file written atomically with owner-only permissions
//! - [`MemoryVault`]: process-local vaults with failure injection, used by
//!   tests of the layers above
//!
//! Nothing here coordinates concurrent writers. Two handles saving the same
//! path overwrite each other; the last save wins.

pub mod contents;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod file;
pub mod memory;

use std::fmt;
use std::path::Path;

use stash_common_secret::SecretString;

pub use entry::{Entry, EntryFields};
pub use error::{VaultError, VaultResult};
pub use file::{FileVault, KdfParams};
pub use memory::MemoryVault;

/// Opens and creates vaults at filesystem paths.
pub trait VaultEngine: Send + Sync + fmt::Debug {
	/// Whether a vault (of any readability) exists at `path`.
	fn exists(&self, path: &Path) -> bool;

	/// Unlock an existing vault. Fails with [`VaultError::InvalidCredentials`]
	/// on a wrong password and [`VaultError::NotFound`] when nothing is there.
	fn open(&self, path: &Path, password: &SecretString) -> VaultResult<Box<dyn VaultHandle>>;

	/// Create and persist an empty vault. Refuses to replace an existing one.
	fn create_empty(&self, path: &Path, password: &SecretString)
		-> VaultResult<Box<dyn VaultHandle>>;

	/// Delete the vault at `path`. Missing vaults are not an error.
	fn remove(&self, path: &Path) -> VaultResult<()>;
}

/// An unlocked vault.
///
/// Mutations only touch memory until [`VaultHandle::save`] succeeds.
pub trait VaultHandle: Send {
	fn entries(&self) -> &[Entry];

	fn find_entry(&self, title: &str) -> Option<&Entry>;

	fn create_entry(&mut self, title: &str, fields: EntryFields) -> VaultResult<&Entry>;

	/// Replace the payload of the entry titled `title`, keeping its identity.
	fn update_entry(&mut self, title: &str, fields: EntryFields) -> VaultResult<&Entry>;

	/// Remove the entry titled `title`. Returns `false` if there was none.
	fn delete_entry(&mut self, title: &str) -> VaultResult<bool>;

	/// Re-key the vault. Takes effect on disk at the next save.
	fn change_password(&mut self, password: &SecretString) -> VaultResult<()>;

	fn save(&mut self) -> VaultResult<()>;
}
