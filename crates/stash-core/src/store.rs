// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ownership of one unlocked vault handle.
//!
//! [`CredentialStore`] opens the vault lazily, serves title lookups through an
//! optional [`EntryCache`], and keeps a `name -> versions` index so version
//! queries do not decode every title on each call. Every save clears the
//! cache in full.
//!
//! The store holds mutable state and is not meant to be shared between
//! threads without external locking.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stash_common_secret::SecretString;
use stash_vault::{Entry, EntryFields, VaultEngine, VaultError, VaultHandle};
use tracing::{debug, warn};

use crate::cache::{CacheSettings, CacheStats, EntryCache};
use crate::codec::VersionCodec;
use crate::error::{StashError, StashResult};
use crate::sanitize::sanitize_message;

/// Versions present for each logical name, rebuilt on open and maintained
/// on every create and delete.
#[derive(Debug, Default)]
struct VersionIndex {
	by_name: BTreeMap<String, BTreeSet<u64>>,
}

impl VersionIndex {
	fn build(entries: &[Entry], codec: &VersionCodec) -> Self {
		let mut index = Self::default();
		for entry in entries {
			index.insert(&entry.title, codec);
		}
		index
	}

	fn insert(&mut self, title: &str, codec: &VersionCodec) {
		if let Some((name, version)) = codec.decode(title) {
			self.by_name
				.entry(name.to_string())
				.or_default()
				.insert(version);
		}
	}

	fn remove(&mut self, title: &str, codec: &VersionCodec) {
		if let Some((name, version)) = codec.decode(title) {
			if let Some(versions) = self.by_name.get_mut(name) {
				versions.remove(&version);
				if versions.is_empty() {
					self.by_name.remove(name);
				}
			}
		}
	}
}

pub struct CredentialStore {
	engine: Arc<dyn VaultEngine>,
	path: PathBuf,
	password: SecretString,
	codec: VersionCodec,
	handle: Option<Box<dyn VaultHandle>>,
	index: VersionIndex,
	cache: Option<EntryCache>,
	open_count: usize,
}

impl fmt::Debug for CredentialStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CredentialStore")
			.field("engine", &self.engine)
			.field("path", &self.path)
			.field("open", &self.handle.is_some())
			.field("cached", &self.cache.as_ref().map(EntryCache::len))
			.field("open_count", &self.open_count)
			.finish_non_exhaustive()
	}
}

impl CredentialStore {
	pub fn new(
		engine: Arc<dyn VaultEngine>,
		path: impl Into<PathBuf>,
		password: SecretString,
		codec: VersionCodec,
		cache: Option<CacheSettings>,
	) -> Self {
		Self {
			engine,
			path: path.into(),
			password,
			codec,
			handle: None,
			index: VersionIndex::default(),
			cache: cache.map(EntryCache::new),
			open_count: 0,
		}
	}

	/// Adopt a handle that is already unlocked, e.g. one just created by
	/// bootstrap. Does not count as an open.
	pub fn with_handle(mut self, handle: Box<dyn VaultHandle>) -> Self {
		self.index = VersionIndex::build(handle.entries(), &self.codec);
		self.handle = Some(handle);
		self
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn codec(&self) -> &VersionCodec {
		&self.codec
	}

	pub(crate) fn password(&self) -> &SecretString {
		&self.password
	}

	pub fn is_open(&self) -> bool {
		self.handle.is_some()
	}

	/// Number of times the vault was actually opened through the engine.
	pub fn open_count(&self) -> usize {
		self.open_count
	}

	pub fn cache_len(&self) -> usize {
		self.cache.as_ref().map_or(0, EntryCache::len)
	}

	pub fn cache_stats(&self) -> Option<CacheStats> {
		self.cache.as_ref().map(EntryCache::stats)
	}

	/// Open the vault if it is not open yet.
	pub fn open(&mut self) -> StashResult<()> {
		self.handle_mut().map(|_| ())
	}

	fn handle_mut(&mut self) -> StashResult<&mut Box<dyn VaultHandle>> {
		if self.handle.is_none() {
			let handle = self
				.engine
				.open(&self.path, &self.password)
				.map_err(|e| self.unavailable(e))?;
			self.open_count += 1;
			self.index = VersionIndex::build(handle.entries(), &self.codec);
			debug!(
				entries = handle.entries().len(),
				names = self.index.by_name.len(),
				"credential store opened"
			);
			self.handle = Some(handle);
		}
		self.handle
			.as_mut()
			.ok_or_else(|| StashError::StoreUnavailable("vault handle missing".to_string()))
	}

	fn unavailable(&self, error: VaultError) -> StashError {
		warn!(error_kind = vault_error_kind(&error), "failed to open credential store");
		StashError::StoreUnavailable(sanitize_message(&error.to_string(), Some(&self.path)))
	}

	/// Look up an entry by physical title, serving from the cache when a live
	/// snapshot is there.
	pub fn find_by_title(&mut self, title: &str) -> StashResult<Option<Entry>> {
		if let Some(entry) = self.cache.as_mut().and_then(|c| c.get(title)) {
			return Ok(Some(entry));
		}

		let found = self.handle_mut()?.find_entry(title).cloned();
		if let (Some(entry), Some(cache)) = (&found, self.cache.as_mut()) {
			cache.insert(title, entry.clone());
		}
		Ok(found)
	}

	/// Sorted versions stored for `name`. Empty when there are none.
	pub fn versions_of(&mut self, name: &str) -> StashResult<Vec<u64>> {
		self.open()?;
		Ok(self
			.index
			.by_name
			.get(name)
			.map(|v| v.iter().copied().collect())
			.unwrap_or_default())
	}

	/// Highest version of every name, ordered by name.
	pub fn latest_versions(&mut self) -> StashResult<BTreeMap<String, u64>> {
		self.open()?;
		Ok(self
			.index
			.by_name
			.iter()
			.filter_map(|(name, versions)| versions.last().map(|v| (name.clone(), *v)))
			.collect())
	}

	pub fn create_entry(&mut self, title: &str, fields: EntryFields) -> StashResult<()> {
		self.handle_mut()?
			.create_entry(title, fields)
			.map_err(|e| StashError::StoreWrite(e.to_string()))?;
		self.index.insert(title, &self.codec);
		self.invalidate(title);
		Ok(())
	}

	pub fn update_entry(&mut self, title: &str, fields: EntryFields) -> StashResult<()> {
		self.handle_mut()?
			.update_entry(title, fields)
			.map_err(|e| StashError::StoreWrite(e.to_string()))?;
		self.invalidate(title);
		Ok(())
	}

	pub fn delete_entry(&mut self, title: &str) -> StashResult<bool> {
		let removed = self
			.handle_mut()?
			.delete_entry(title)
			.map_err(|e| StashError::StoreWrite(e.to_string()))?;
		if removed {
			self.index.remove(title, &self.codec);
		}
		self.invalidate(title);
		Ok(removed)
	}

	/// Persist the vault, then drop every cached entry.
	///
	/// On failure the handle stays open with the unsaved changes, so the
	/// caller may retry.
	pub fn save(&mut self) -> StashResult<()> {
		let path = self.path.clone();
		let result = self
			.handle_mut()?
			.save()
			.map_err(|e| StashError::StoreWrite(sanitize_message(&e.to_string(), Some(&path))));
		self.clear_cache();
		if result.is_ok() {
			debug!("credential store saved");
		}
		result
	}

	pub fn clear_cache(&mut self) {
		if let Some(cache) = self.cache.as_mut() {
			cache.clear();
		}
	}

	/// Re-key the open vault. Callers must `save` for it to reach disk.
	pub fn change_password(&mut self, password: SecretString) -> StashResult<()> {
		self.handle_mut()?
			.change_password(&password)
			.map_err(|e| StashError::StoreWrite(e.to_string()))?;
		self.password = password;
		Ok(())
	}

	/// Drop the handle and cache. The next access reopens the vault.
	pub fn close(&mut self) {
		if self.handle.take().is_some() {
			debug!("credential store closed");
		}
		self.index = VersionIndex::default();
		self.clear_cache();
	}

	fn invalidate(&mut self, title: &str) {
		if let Some(cache) = self.cache.as_mut() {
			cache.invalidate(title);
		}
	}
}

fn vault_error_kind(error: &VaultError) -> &'static str {
	match error {
		VaultError::NotFound { .. } => "not_found",
		VaultError::InvalidCredentials => "invalid_credentials",
		VaultError::Corrupt(_) | VaultError::UnsupportedVersion(_) => "corrupt",
		VaultError::Io(_) => "io",
		_ => "other",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use stash_vault::MemoryVault;

	const PATH: &str = "/vaults/test.vault";

	fn seeded(engine: &MemoryVault, titles: &[&str]) {
		let mut handle = engine
			.create_empty(Path::new(PATH), &SecretString::from("pw"))
			.unwrap();
		for title in titles {
			handle
				.create_entry(
					title,
					EntryFields {
						password: Some(format!("secret-{title}")),
						..Default::default()
					},
				)
				.unwrap();
		}
		handle.save().unwrap();
	}

	fn store(engine: &MemoryVault, cache: Option<CacheSettings>) -> CredentialStore {
		CredentialStore::new(
			Arc::new(engine.clone()),
			PATH,
			SecretString::from("pw"),
			VersionCodec::default(),
			cache,
		)
	}

	#[test]
	fn test_open_is_lazy_and_idempotent() {
		let engine = MemoryVault::new();
		seeded(&engine, &["a@@0000000001"]);
		let mut store = store(&engine, None);
		assert!(!store.is_open());

		store.find_by_title("a@@0000000001").unwrap();
		store.find_by_title("missing").unwrap();
		store.open().unwrap();
		assert_eq!(store.open_count(), 1);
		assert_eq!(engine.open_count(), 1);
	}

	#[test]
	fn test_open_failure_is_sanitized() {
		let engine = MemoryVault::new();
		let mut store = store(&engine, None);
		let err = store.open().unwrap_err();
		let StashError::StoreUnavailable(message) = err else {
			panic!("expected StoreUnavailable");
		};
		assert!(!message.contains(PATH));
		assert!(message.contains("<database>"));
	}

	#[test]
	fn test_wrong_password_is_unavailable() {
		let engine = MemoryVault::new();
		seeded(&engine, &[]);
		let mut store = CredentialStore::new(
			Arc::new(engine.clone()),
			PATH,
			SecretString::from("wrong"),
			VersionCodec::default(),
			None,
		);
		assert!(matches!(store.open(), Err(StashError::StoreUnavailable(_))));
		assert!(!store.is_open());
	}

	#[test]
	fn test_cache_hit_and_clear_on_save() {
		let engine = MemoryVault::new();
		seeded(&engine, &["a@@0000000001"]);
		let mut store = store(&engine, Some(CacheSettings::default()));

		store.find_by_title("a@@0000000001").unwrap().unwrap();
		assert_eq!(store.cache_len(), 1);
		store.find_by_title("a@@0000000001").unwrap().unwrap();
		assert_eq!(store.cache_stats().unwrap().hits, 1);

		store.save().unwrap();
		assert_eq!(store.cache_len(), 0);
	}

	#[test]
	fn test_failed_save_keeps_handle_and_clears_cache() {
		let engine = MemoryVault::new();
		seeded(&engine, &["a@@0000000001"]);
		let mut store = store(&engine, Some(CacheSettings::default()));
		store.find_by_title("a@@0000000001").unwrap();

		engine.set_fail_saves(true);
		store
			.create_entry("a@@0000000002", EntryFields::default())
			.unwrap();
		assert!(matches!(store.save(), Err(StashError::StoreWrite(_))));
		assert!(store.is_open());
		assert_eq!(store.cache_len(), 0);

		engine.set_fail_saves(false);
		store.save().unwrap();
		assert_eq!(engine.saved_titles(Path::new(PATH)).len(), 2);
	}

	#[test]
	fn test_index_tracks_mutations() {
		let engine = MemoryVault::new();
		seeded(
			&engine,
			&["a@@0000000001", "a@@0000000003", "b@@0000000001", "unmanaged"],
		);
		let mut store = store(&engine, None);
		assert_eq!(store.versions_of("a").unwrap(), vec![1, 3]);
		assert!(store.versions_of("unmanaged").unwrap().is_empty());

		store
			.create_entry("a@@0000000004", EntryFields::default())
			.unwrap();
		store.delete_entry("b@@0000000001").unwrap();
		let latest = store.latest_versions().unwrap();
		assert_eq!(latest.get("a"), Some(&4));
		assert!(!latest.contains_key("b"));
	}

	#[test]
	fn test_update_invalidates_cached_title() {
		let engine = MemoryVault::new();
		seeded(&engine, &["a@@0000000001"]);
		let mut store = store(&engine, Some(CacheSettings::default()));
		store.find_by_title("a@@0000000001").unwrap();
		store
			.update_entry(
				"a@@0000000001",
				EntryFields {
					password: Some("new".into()),
					..Default::default()
				},
			)
			.unwrap();
		let entry = store.find_by_title("a@@0000000001").unwrap().unwrap();
		assert_eq!(entry.password.as_deref(), Some("new"));
	}

	#[test]
	fn test_close_then_reopen() {
		let engine = MemoryVault::new();
		seeded(&engine, &[]);
		let mut store = store(&engine, None);
		store.open().unwrap();
		store.close();
		assert!(!store.is_open());
		store.open().unwrap();
		assert_eq!(store.open_count(), 2);
	}
}
