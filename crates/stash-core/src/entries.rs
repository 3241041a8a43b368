// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Versioned CRUD over a [`CredentialStore`].

use tracing::{debug, info};

use crate::codec::VersionCodec;
use crate::credential::{CredentialInput, CredentialResult};
use crate::error::StashResult;
use crate::store::CredentialStore;
use crate::validation::{validate_fields, validate_name};

/// What a `put` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOutcome {
	pub version: u64,
	/// `false` when an explicit version overwrote an existing entry in place.
	pub created: bool,
}

#[derive(Debug)]
pub struct EntryManager {
	store: CredentialStore,
	mask: String,
}

impl EntryManager {
	pub fn new(store: CredentialStore, mask: impl Into<String>) -> Self {
		Self {
			store,
			mask: mask.into(),
		}
	}

	pub fn store(&self) -> &CredentialStore {
		&self.store
	}

	pub fn store_mut(&mut self) -> &mut CredentialStore {
		&mut self.store
	}

	fn codec(&self) -> VersionCodec {
		*self.store.codec()
	}

	/// Store a new version of `name`.
	///
	/// Without `explicit_version` the next version after the current maximum
	/// is written. An explicit version that already exists is overwritten in
	/// place; one that does not is created, leaving any gap as is.
	pub fn put(
		&mut self,
		name: &str,
		input: CredentialInput,
		explicit_version: Option<u64>,
	) -> StashResult<PutOutcome> {
		validate_name(name)?;
		let fields = input.into_fields();
		validate_fields(&fields)?;

		let existing = self.store.versions_of(name)?;
		let version = explicit_version
			.unwrap_or_else(|| VersionCodec::next_version(existing.iter().copied()));
		let title = self.codec().encode(name, version)?;

		let created = if existing.binary_search(&version).is_ok() {
			self.store.update_entry(&title, fields)?;
			false
		} else {
			self.store.create_entry(&title, fields)?;
			true
		};
		self.store.save()?;

		info!(name, version, created, "stored credential");
		Ok(PutOutcome { version, created })
	}

	/// Fetch the latest version of `name`, or `version` exactly.
	pub fn get(
		&mut self,
		name: &str,
		version: Option<u64>,
		show_password: bool,
	) -> StashResult<Option<CredentialResult>> {
		validate_name(name)?;
		let version = match version {
			Some(v) => v,
			None => match self.store.versions_of(name)?.last() {
				Some(latest) => *latest,
				None => return Ok(None),
			},
		};
		let title = self.codec().encode(name, version)?;

		Ok(self.store.find_by_title(&title)?.map(|entry| {
			CredentialResult::from_entry(name, version, &entry, show_password, &self.mask)
		}))
	}

	/// Latest version of every name, sorted by name.
	pub fn list(
		&mut self,
		prefix: Option<&str>,
		show_password: bool,
	) -> StashResult<Vec<CredentialResult>> {
		let codec = self.codec();
		let latest = self.store.latest_versions()?;
		let mut results = Vec::with_capacity(latest.len());

		for (name, version) in latest {
			if prefix.is_some_and(|p| !name.starts_with(p)) {
				continue;
			}
			let title = codec.encode(&name, version)?;
			match self.store.find_by_title(&title)? {
				Some(entry) => results.push(CredentialResult::from_entry(
					&name,
					version,
					&entry,
					show_password,
					&self.mask,
				)),
				None => debug!(name = %name, version, "entry vanished during list, skipping"),
			}
		}
		Ok(results)
	}

	/// Names with at least one version, sorted.
	pub fn keys(&mut self, prefix: Option<&str>) -> StashResult<Vec<String>> {
		Ok(self
			.store
			.latest_versions()?
			.into_keys()
			.filter(|name| prefix.map_or(true, |p| name.starts_with(p)))
			.collect())
	}

	/// Remove every version of `name`. Returns `false` if there were none.
	pub fn delete(&mut self, name: &str) -> StashResult<bool> {
		validate_name(name)?;
		let codec = self.codec();
		let versions = self.store.versions_of(name)?;
		if versions.is_empty() {
			return Ok(false);
		}

		let mut removed = 0usize;
		for version in &versions {
			let title = codec.encode(name, *version)?;
			if self.store.delete_entry(&title)? {
				removed += 1;
			}
		}
		if removed == 0 {
			return Ok(false);
		}
		self.store.save()?;

		info!(name, removed, "deleted credential");
		Ok(true)
	}

	/// Versions stored for `name`, ascending. Empty when there are none.
	pub fn versions(&mut self, name: &str) -> StashResult<Vec<u64>> {
		validate_name(name)?;
		self.store.versions_of(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cache::CacheSettings;
	use crate::credential::DEFAULT_PASSWORD_MASK;
	use crate::error::StashError;
	use stash_common_secret::SecretString;
	use stash_vault::{EntryFields, MemoryVault, VaultEngine};
	use std::path::Path;
	use std::sync::Arc;

	const PATH: &str = "/vaults/entries.vault";

	fn manager_with(engine: &MemoryVault, cache: Option<CacheSettings>) -> EntryManager {
		if !engine.exists(Path::new(PATH)) {
			engine
				.create_empty(Path::new(PATH), &SecretString::from("pw"))
				.unwrap();
		}
		let store = CredentialStore::new(
			Arc::new(engine.clone()),
			PATH,
			SecretString::from("pw"),
			VersionCodec::default(),
			cache,
		);
		EntryManager::new(store, DEFAULT_PASSWORD_MASK)
	}

	fn manager() -> EntryManager {
		manager_with(&MemoryVault::new(), None)
	}

	#[test]
	fn test_api_token_scenario() {
		let mut m = manager();
		let first = m.put("api-token", CredentialInput::value("sk-123"), None).unwrap();
		assert_eq!(first.version, 1);

		let masked = m.get("api-token", None, false).unwrap().unwrap();
		assert!(masked.is_simple());
		assert_eq!(masked.secret(), Some("*****"));
		let revealed = m.get("api-token", None, true).unwrap().unwrap();
		assert_eq!(revealed.secret(), Some("sk-123"));

		let second = m.put("api-token", CredentialInput::value("sk-456"), None).unwrap();
		assert_eq!(second.version, 2);
		assert_eq!(m.versions("api-token").unwrap(), vec![1, 2]);
		let v1 = m.get("api-token", Some(1), true).unwrap().unwrap();
		assert_eq!(v1.secret(), Some("sk-123"));
		let latest = m.get("api-token", None, true).unwrap().unwrap();
		assert_eq!(latest.secret(), Some("sk-456"));
	}

	#[test]
	fn test_structured_credential_scenario() {
		let mut m = manager();
		let input = CredentialInput::default()
			.with_username("u")
			.with_password("p")
			.with_url("host:5432");
		m.put("db", input, None).unwrap();

		let result = m.get("db", None, false).unwrap().unwrap();
		let CredentialResult::Full(cred) = result else {
			panic!("expected a structured credential");
		};
		assert_eq!(cred.username.as_deref(), Some("u"));
		assert_eq!(cred.password.as_deref(), Some("*****"));
	}

	#[test]
	fn test_monotonic_versions() {
		let mut m = manager();
		for i in 0..5 {
			m.put("n", CredentialInput::value(format!("v{i}")), None).unwrap();
		}
		assert_eq!(m.versions("n").unwrap(), vec![1, 2, 3, 4, 5]);
	}

	#[test]
	fn test_explicit_version_collision_overwrites_in_place() {
		let engine = MemoryVault::new();
		let mut m = manager_with(&engine, None);
		m.put("n", CredentialInput::value("one"), None).unwrap();
		m.put("n", CredentialInput::value("two"), None).unwrap();

		let outcome = m.put("n", CredentialInput::value("uno"), Some(1)).unwrap();
		assert_eq!(outcome, PutOutcome { version: 1, created: false });
		assert_eq!(m.versions("n").unwrap(), vec![1, 2]);
		assert_eq!(m.get("n", Some(1), true).unwrap().unwrap().secret(), Some("uno"));
		assert_eq!(engine.saved_titles(Path::new(PATH)).len(), 2);
	}

	#[test]
	fn test_explicit_version_may_skip() {
		let mut m = manager();
		m.put("n", CredentialInput::value("a"), None).unwrap();
		let outcome = m.put("n", CredentialInput::value("b"), Some(10)).unwrap();
		assert!(outcome.created);
		assert_eq!(m.versions("n").unwrap(), vec![1, 10]);
		assert_eq!(m.put("n", CredentialInput::value("c"), None).unwrap().version, 11);
	}

	#[test]
	fn test_get_missing_is_none() {
		let mut m = manager();
		assert!(m.get("nothing", None, false).unwrap().is_none());
		assert!(m.get("nothing", Some(3), false).unwrap().is_none());
		assert!(m.versions("nothing").unwrap().is_empty());
		assert!(!m.delete("nothing").unwrap());
	}

	#[test]
	fn test_delete_completeness() {
		let mut m = manager();
		for v in ["1", "2", "3"] {
			m.put("gone", CredentialInput::value(v), None).unwrap();
		}
		m.put("kept", CredentialInput::value("k"), None).unwrap();

		assert!(m.delete("gone").unwrap());
		assert!(m.versions("gone").unwrap().is_empty());
		assert!(m.get("gone", Some(2), true).unwrap().is_none());
		assert!(m.get("kept", None, true).unwrap().is_some());
	}

	#[test]
	fn test_list_latest_sorted_and_filtered() {
		let mut m = manager();
		m.put("svc-b", CredentialInput::value("b1"), None).unwrap();
		m.put("svc-a", CredentialInput::value("a1"), None).unwrap();
		m.put("svc-a", CredentialInput::value("a2"), None).unwrap();
		m.put("other", CredentialInput::value("o"), None).unwrap();

		let all = m.list(None, true).unwrap();
		let names: Vec<_> = all.iter().map(|r| r.name()).collect();
		assert_eq!(names, vec!["other", "svc-a", "svc-b"]);
		assert_eq!(all[1].version(), 2);
		assert_eq!(all[1].secret(), Some("a2"));

		let svc = m.list(Some("svc-"), false).unwrap();
		assert_eq!(svc.len(), 2);
		assert!(svc.iter().all(|r| r.secret() == Some("*****")));

		assert_eq!(m.keys(Some("svc-")).unwrap(), vec!["svc-a", "svc-b"]);
	}

	#[test]
	fn test_unmanaged_entries_are_ignored() {
		let engine = MemoryVault::new();
		let mut handle = engine
			.create_empty(Path::new(PATH), &SecretString::from("pw"))
			.unwrap();
		handle.create_entry("legacy entry", EntryFields::default()).unwrap();
		handle.create_entry("odd@@12", EntryFields::default()).unwrap();
		handle.save().unwrap();

		let mut m = manager_with(&engine, None);
		assert!(m.list(None, false).unwrap().is_empty());
		m.put("odd", CredentialInput::value("x"), None).unwrap();
		assert_eq!(m.versions("odd").unwrap(), vec![1]);
	}

	#[test]
	fn test_cache_transparency() {
		let mut m = manager_with(&MemoryVault::new(), Some(CacheSettings::default()));
		m.put("x", CredentialInput::value("old"), None).unwrap();
		assert_eq!(m.get("x", None, true).unwrap().unwrap().secret(), Some("old"));

		m.put("x", CredentialInput::value("new"), None).unwrap();
		assert_eq!(m.store().cache_len(), 0);
		assert_eq!(m.get("x", None, true).unwrap().unwrap().secret(), Some("new"));
	}

	#[test]
	fn test_invalid_input_is_rejected_before_writing() {
		let engine = MemoryVault::new();
		let mut m = manager_with(&engine, None);
		assert!(matches!(
			m.put(".hidden", CredentialInput::value("x"), None),
			Err(StashError::InvalidName(_))
		));
		assert!(matches!(
			m.put("ok", CredentialInput::value("x").with_url("host:notaport"), None),
			Err(StashError::InvalidField { field: "url", .. })
		));
		assert!(matches!(
			m.put("ok", CredentialInput::value("x"), Some(0)),
			Err(StashError::InvalidField { field: "version", .. })
		));
		assert!(engine.saved_titles(Path::new(PATH)).is_empty());
	}

	#[test]
	fn test_save_failure_surfaces_as_store_write() {
		let engine = MemoryVault::new();
		let mut m = manager_with(&engine, None);
		engine.set_fail_saves(true);
		assert!(matches!(
			m.put("n", CredentialInput::value("x"), None),
			Err(StashError::StoreWrite(_))
		));
	}
}
