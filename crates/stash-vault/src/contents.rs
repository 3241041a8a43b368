// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decrypted vault contents shared by every engine.

use serde::{Deserialize, Serialize};

use crate::entry::{Entry, EntryFields};
use crate::error::{VaultError, VaultResult};

/// The plaintext payload of a vault: a flat list of entries with unique titles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultContents {
	#[serde(default)]
	pub entries: Vec<Entry>,
}

impl VaultContents {
	pub fn find(&self, title: &str) -> Option<&Entry> {
		self.entries.iter().find(|e| e.title == title)
	}

	pub fn create(&mut self, title: &str, fields: EntryFields) -> VaultResult<&Entry> {
		if self.find(title).is_some() {
			return Err(VaultError::DuplicateTitle(title.to_string()));
		}
		self.entries.push(Entry::new(title, fields));
		let idx = self.entries.len() - 1;
		Ok(&self.entries[idx])
	}

	pub fn update(&mut self, title: &str, fields: EntryFields) -> VaultResult<&Entry> {
		let entry = self
			.entries
			.iter_mut()
			.find(|e| e.title == title)
			.ok_or_else(|| VaultError::EntryNotFound(title.to_string()))?;
		entry.apply(fields);
		Ok(entry)
	}

	pub fn delete(&mut self, title: &str) -> bool {
		let before = self.entries.len();
		self.entries.retain(|e| e.title != title);
		self.entries.len() != before
	}
}
