// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Input validation for credential names and payload fields.
//!
//! Lengths are counted in characters, not bytes.

use std::collections::{BTreeMap, BTreeSet};

use stash_vault::EntryFields;

use crate::codec::SEPARATOR;
use crate::error::{StashError, StashResult};

pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_USERNAME_LENGTH: usize = 255;
pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_NOTES_LENGTH: usize = 65_535;
pub const MAX_TAG_LENGTH: usize = 255;

const FORBIDDEN_NAME_CHARS: [char; 6] = ['/', '\\', '\0', '\n', '\r', '\t'];

pub fn validate_name(name: &str) -> StashResult<()> {
	if name.trim().is_empty() {
		return Err(StashError::invalid_name("name cannot be empty"));
	}
	let len = name.chars().count();
	if len > MAX_NAME_LENGTH {
		return Err(StashError::invalid_name(format!(
			"name is {len} characters, max {MAX_NAME_LENGTH}"
		)));
	}
	if let Some(c) = name.chars().find(|c| FORBIDDEN_NAME_CHARS.contains(c)) {
		return Err(StashError::invalid_name(format!(
			"name contains forbidden character {c:?}"
		)));
	}
	if name.starts_with('.') {
		return Err(StashError::invalid_name("name cannot start with '.'"));
	}
	if name.contains(SEPARATOR) {
		return Err(StashError::invalid_name(format!(
			"name cannot contain the reserved sequence '{SEPARATOR}'"
		)));
	}
	Ok(())
}

pub fn validate_username(username: Option<&str>) -> StashResult<()> {
	if let Some(username) = username {
		check_length("username", username, MAX_USERNAME_LENGTH)?;
	}
	Ok(())
}

/// Accepts a full URL (`scheme://...`), a bare `host:port` pair, or a bare
/// host. The value is checked but stored exactly as given.
pub fn validate_url(url: Option<&str>) -> StashResult<()> {
	let Some(url) = url.filter(|u| !u.trim().is_empty()) else {
		return Ok(());
	};
	check_length("url", url, MAX_URL_LENGTH)?;
	if url.chars().any(char::is_control) {
		return Err(StashError::invalid_field(
			"url",
			"contains control characters",
		));
	}

	let url = url.trim();
	if url.contains("://") {
		url::Url::parse(url).map_err(|e| StashError::invalid_field("url", e.to_string()))?;
		return Ok(());
	}

	if url.chars().any(char::is_whitespace) {
		return Err(StashError::invalid_field("url", "contains whitespace"));
	}
	if let Some((host, port)) = split_host_port(url) {
		if host.is_empty() {
			return Err(StashError::invalid_field("url", "missing host before port"));
		}
		port.parse::<u16>().map_err(|_| {
			StashError::invalid_field("url", format!("invalid port '{port}'"))
		})?;
	}
	Ok(())
}

pub fn validate_notes(notes: Option<&str>) -> StashResult<()> {
	if let Some(notes) = notes {
		check_length("notes", notes, MAX_NOTES_LENGTH)?;
	}
	Ok(())
}

pub fn validate_tags(tags: &BTreeSet<String>) -> StashResult<()> {
	for tag in tags {
		if tag.trim().is_empty() {
			return Err(StashError::invalid_field("tags", "tags cannot be empty"));
		}
		check_length("tags", tag, MAX_TAG_LENGTH)?;
		if tag.chars().any(char::is_control) {
			return Err(StashError::invalid_field(
				"tags",
				format!("tag {tag:?} contains control characters"),
			));
		}
	}
	Ok(())
}

pub fn validate_custom_properties(properties: &BTreeMap<String, String>) -> StashResult<()> {
	if properties.keys().any(|k| k.trim().is_empty()) {
		return Err(StashError::invalid_field(
			"custom_properties",
			"property keys cannot be empty",
		));
	}
	Ok(())
}

pub fn validate_fields(fields: &EntryFields) -> StashResult<()> {
	validate_username(fields.username.as_deref())?;
	validate_url(fields.url.as_deref())?;
	validate_notes(fields.notes.as_deref())?;
	validate_tags(&fields.tags)?;
	validate_custom_properties(&fields.custom_properties)
}

/// Split `host:port`, treating a bracketed IPv6 literal as the host.
/// Returns `None` when there is no port part.
pub(crate) fn split_host_port(value: &str) -> Option<(&str, &str)> {
	if let Some(rest) = value.strip_prefix('[') {
		let close = rest.find(']')?;
		let port = rest[close + 1..].strip_prefix(':')?;
		return Some((&value[..close + 2], port));
	}
	value.rsplit_once(':')
}

fn check_length(field: &'static str, value: &str, max: usize) -> StashResult<()> {
	let len = value.chars().count();
	if len > max {
		return Err(StashError::invalid_field(
			field,
			format!("{len} characters exceeds the limit of {max}"),
		));
	}
	Ok(())
}
