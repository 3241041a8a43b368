// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Entry records stored inside a vault.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One physical record in a vault.
///
/// The title is the only lookup key. The vault itself attaches no meaning to
/// it; version encoding happens in the layer above.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
	pub uuid: Uuid,
	pub title: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub password: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	#[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
	pub tags: BTreeSet<String>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub custom_properties: BTreeMap<String, String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Entry {
	pub fn new(title: impl Into<String>, fields: EntryFields) -> Self {
		let now = Utc::now();
		let mut entry = Self {
			uuid: Uuid::new_v4(),
			title: title.into(),
			username: None,
			password: None,
			url: None,
			notes: None,
			tags: BTreeSet::new(),
			custom_properties: BTreeMap::new(),
			created_at: now,
			updated_at: now,
		};
		entry.apply(fields);
		entry
	}

	/// Overwrite every payload field, keeping uuid, title and creation time.
	pub fn apply(&mut self, fields: EntryFields) {
		self.username = fields.username;
		self.password = fields.password;
		self.url = fields.url;
		self.notes = fields.notes;
		self.tags = fields.tags;
		self.custom_properties = fields.custom_properties;
		self.updated_at = Utc::now();
	}

	pub fn fields(&self) -> EntryFields {
		EntryFields {
			username: self.username.clone(),
			password: self.password.clone(),
			url: self.url.clone(),
			notes: self.notes.clone(),
			tags: self.tags.clone(),
			custom_properties: self.custom_properties.clone(),
		}
	}
}

impl fmt::Debug for Entry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Entry")
			.field("uuid", &self.uuid)
			.field("title", &self.title)
			.field("username", &self.username)
			.field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
			.field("url", &self.url)
			.field("tags", &self.tags)
			.field("custom_properties", &self.custom_properties.keys())
			.field("updated_at", &self.updated_at)
			.finish()
	}
}

/// The mutable payload of an entry.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EntryFields {
	pub username: Option<String>,
	pub password: Option<String>,
	pub url: Option<String>,
	pub notes: Option<String>,
	pub tags: BTreeSet<String>,
	pub custom_properties: BTreeMap<String, String>,
}

impl fmt::Debug for EntryFields {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EntryFields")
			.field("username", &self.username)
			.field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
			.field("url", &self.url)
			.field("tags", &self.tags)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_debug_hides_password() {
		let entry = Entry::new(
			"db@@0000000001",
			EntryFields {
				password: Some("hunter2".to_string()),
				..Default::default()
			},
		);
		let debug = format!("{entry:?}");
		assert!(!debug.contains("hunter2"));
		assert!(debug.contains("[REDACTED]"));
	}

	#[test]
	fn test_apply_keeps_identity() {
		let mut entry = Entry::new("a", EntryFields::default());
		let uuid = entry.uuid;
		let created = entry.created_at;
		entry.apply(EntryFields {
			username: Some("u".to_string()),
			..Default::default()
		});
		assert_eq!(entry.uuid, uuid);
		assert_eq!(entry.created_at, created);
		assert_eq!(entry.username.as_deref(), Some("u"));
	}

	#[test]
	fn test_empty_collections_are_not_serialized() {
		let entry = Entry::new("a", EntryFields::default());
		let json = serde_json::to_string(&entry).unwrap();
		assert!(!json.contains("tags"));
		assert!(!json.contains("custom_properties"));
		let back: Entry = serde_json::from_str(&json).unwrap();
		assert_eq!(back, entry);
	}
}
