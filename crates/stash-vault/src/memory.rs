// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process vault engine.
//!
//! Vaults live in a map shared by every clone of the engine, so a test can
//! keep one clone for inspection while the code under test owns another.
//! Saves and creations can be made to fail on demand.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use stash_common_secret::SecretString;

use crate::contents::VaultContents;
use crate::entry::{Entry, EntryFields};
use crate::error::{VaultError, VaultResult};
use crate::{VaultEngine, VaultHandle};

#[derive(Debug)]
struct StoredVault {
	password: SecretString,
	contents: VaultContents,
}

type Shelf = Arc<Mutex<HashMap<PathBuf, StoredVault>>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryVault {
	shelf: Shelf,
	fail_saves: Arc<AtomicBool>,
	fail_creates: Arc<AtomicBool>,
	opens: Arc<AtomicUsize>,
}

impl MemoryVault {
	pub fn new() -> Self {
		Self::default()
	}

	/// Make every subsequent `save` fail with [`VaultError::Injected`].
	pub fn set_fail_saves(&self, fail: bool) {
		self.fail_saves.store(fail, Ordering::SeqCst);
	}

	/// Make every subsequent `create_empty` fail with [`VaultError::Injected`].
	pub fn set_fail_creates(&self, fail: bool) {
		self.fail_creates.store(fail, Ordering::SeqCst);
	}

	/// Number of successful `open` calls across all clones.
	pub fn open_count(&self) -> usize {
		self.opens.load(Ordering::SeqCst)
	}

	/// Titles persisted at `path` by the last successful save.
	pub fn saved_titles(&self, path: &Path) -> Vec<String> {
		lock(&self.shelf)
			.get(path)
			.map(|v| v.contents.entries.iter().map(|e| e.title.clone()).collect())
			.unwrap_or_default()
	}
}

fn lock(shelf: &Shelf) -> MutexGuard<'_, HashMap<PathBuf, StoredVault>> {
	shelf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl VaultEngine for MemoryVault {
	fn exists(&self, path: &Path) -> bool {
		lock(&self.shelf).contains_key(path)
	}

	fn open(&self, path: &Path, password: &SecretString) -> VaultResult<Box<dyn VaultHandle>> {
		let shelf = lock(&self.shelf);
		let stored = shelf.get(path).ok_or_else(|| VaultError::NotFound {
			path: path.to_path_buf(),
		})?;
		if stored.password != *password {
			return Err(VaultError::InvalidCredentials);
		}
		self.opens.fetch_add(1, Ordering::SeqCst);
		Ok(Box::new(MemoryHandle {
			path: path.to_path_buf(),
			password: password.clone(),
			contents: stored.contents.clone(),
			shelf: Arc::clone(&self.shelf),
			fail_saves: Arc::clone(&self.fail_saves),
		}))
	}

	fn create_empty(
		&self,
		path: &Path,
		password: &SecretString,
	) -> VaultResult<Box<dyn VaultHandle>> {
		if self.fail_creates.load(Ordering::SeqCst) {
			return Err(VaultError::Injected("create"));
		}
		let mut shelf = lock(&self.shelf);
		if shelf.contains_key(path) {
			return Err(VaultError::AlreadyExists {
				path: path.to_path_buf(),
			});
		}
		shelf.insert(
			path.to_path_buf(),
			StoredVault {
				password: password.clone(),
				contents: VaultContents::default(),
			},
		);
		Ok(Box::new(MemoryHandle {
			path: path.to_path_buf(),
			password: password.clone(),
			contents: VaultContents::default(),
			shelf: Arc::clone(&self.shelf),
			fail_saves: Arc::clone(&self.fail_saves),
		}))
	}

	fn remove(&self, path: &Path) -> VaultResult<()> {
		lock(&self.shelf).remove(path);
		Ok(())
	}
}

struct MemoryHandle {
	path: PathBuf,
	password: SecretString,
	contents: VaultContents,
	shelf: Shelf,
	fail_saves: Arc<AtomicBool>,
}

impl VaultHandle for MemoryHandle {
	fn entries(&self) -> &[Entry] {
		&self.contents.entries
	}

	fn find_entry(&self, title: &str) -> Option<&Entry> {
		self.contents.find(title)
	}

	fn create_entry(&mut self, title: &str, fields: EntryFields) -> VaultResult<&Entry> {
		self.contents.create(title, fields)
	}

	fn update_entry(&mut self, title: &str, fields: EntryFields) -> VaultResult<&Entry> {
		self.contents.update(title, fields)
	}

	fn delete_entry(&mut self, title: &str) -> VaultResult<bool> {
		Ok(self.contents.delete(title))
	}

	fn change_password(&mut self, password: &SecretString) -> VaultResult<()> {
		self.password = password.clone();
		Ok(())
	}

	fn save(&mut self) -> VaultResult<()> {
		if self.fail_saves.load(Ordering::SeqCst) {
			return Err(VaultError::Injected("save"));
		}
		lock(&self.shelf).insert(
			self.path.clone(),
			StoredVault {
				password: self.password.clone(),
				contents: self.contents.clone(),
			},
		);
		Ok(())
	}
}
