// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential payloads going in and results coming out.
//!
//! Storage has a single schema. Whether a lookup surfaces as a simple secret
//! or a full credential is decided here, in [`CredentialResult::from_entry`],
//! and nowhere else.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use stash_common_secret::SecretString;
use stash_vault::{Entry, EntryFields};

/// Mask shown in place of a secret unless the caller asks to reveal it.
pub const DEFAULT_PASSWORD_MASK: &str = "*****";

/// What a caller wants to store under a name.
#[derive(Debug, Clone, Default)]
pub struct CredentialInput {
	pub username: Option<String>,
	pub password: Option<SecretString>,
	pub url: Option<String>,
	pub notes: Option<String>,
	pub tags: BTreeSet<String>,
	pub custom_properties: BTreeMap<String, String>,
}

impl CredentialInput {
	/// A simple secret: only the value, stored in the password field.
	pub fn value(value: impl Into<SecretString>) -> Self {
		Self {
			password: Some(value.into()),
			..Default::default()
		}
	}

	pub fn with_username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());
		self
	}

	pub fn with_password(mut self, password: impl Into<SecretString>) -> Self {
		self.password = Some(password.into());
		self
	}

	pub fn with_url(mut self, url: impl Into<String>) -> Self {
		self.url = Some(url.into());
		self
	}

	pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
		self.notes = Some(notes.into());
		self
	}

	pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
		self.tags.insert(tag.into());
		self
	}

	pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.custom_properties.insert(key.into(), value.into());
		self
	}

	/// Convert to vault fields. This is where the secret leaves its wrapper.
	pub(crate) fn into_fields(self) -> EntryFields {
		EntryFields {
			username: self.username,
			password: self.password.map(|p| p.expose().clone()),
			url: self.url,
			notes: self.notes,
			tags: self.tags,
			custom_properties: self.custom_properties,
		}
	}
}

/// A credential holding only an opaque value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimpleSecret {
	pub name: String,
	pub value: Option<String>,
	pub version: u64,
}

/// A structured credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	pub name: String,
	pub username: Option<String>,
	pub password: Option<String>,
	pub url: Option<String>,
	pub notes: Option<String>,
	#[serde(default)]
	pub tags: BTreeSet<String>,
	#[serde(default)]
	pub custom_properties: BTreeMap<String, String>,
	pub version: u64,
}

/// Result of a lookup.
///
/// Serialized untagged: a simple secret is `{name, value, version}`, a full
/// credential carries every field (absent ones as `null`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CredentialResult {
	Simple(SimpleSecret),
	Full(Credential),
}

impl CredentialResult {
	/// Build the caller-facing view of an entry.
	///
	/// The entry is a simple secret when username, url, notes, tags and
	/// custom properties are all absent or empty. When `show_password` is
	/// false a non-empty secret is replaced by `mask`; an empty secret is
	/// reported as `None` either way.
	pub fn from_entry(
		name: &str,
		version: u64,
		entry: &Entry,
		show_password: bool,
		mask: &str,
	) -> Self {
		let secret = entry
			.password
			.as_deref()
			.filter(|p| !p.is_empty())
			.map(|p| {
				if show_password {
					p.to_string()
				} else {
					mask.to_string()
				}
			});

		if is_simple(entry) {
			return Self::Simple(SimpleSecret {
				name: name.to_string(),
				value: secret,
				version,
			});
		}

		Self::Full(Credential {
			name: name.to_string(),
			username: non_empty(&entry.username),
			password: secret,
			url: non_empty(&entry.url),
			notes: non_empty(&entry.notes),
			tags: entry.tags.clone(),
			custom_properties: entry.custom_properties.clone(),
			version,
		})
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Simple(s) => &s.name,
			Self::Full(c) => &c.name,
		}
	}

	pub fn version(&self) -> u64 {
		match self {
			Self::Simple(s) => s.version,
			Self::Full(c) => c.version,
		}
	}

	/// The secret as returned: masked, revealed, or absent.
	pub fn secret(&self) -> Option<&str> {
		match self {
			Self::Simple(s) => s.value.as_deref(),
			Self::Full(c) => c.password.as_deref(),
		}
	}

	pub fn is_simple(&self) -> bool {
		matches!(self, Self::Simple(_))
	}
}

fn is_simple(entry: &Entry) -> bool {
	non_empty(&entry.username).is_none()
		&& non_empty(&entry.url).is_none()
		&& non_empty(&entry.notes).is_none()
		&& entry.tags.is_empty()
		&& entry.custom_properties.is_empty()
}

fn non_empty(value: &Option<String>) -> Option<String> {
	value.as_ref().filter(|v| !v.is_empty()).cloned()
}
