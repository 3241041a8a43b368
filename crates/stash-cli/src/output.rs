// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Human and JSON renderings of command results.

use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;
use stash_common_secret::REDACTED;
use stash_core::{CredentialResult, S3ClientConfig};

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
	Ok(serde_json::to_string_pretty(value)?)
}

/// Multi-line view of one credential, as printed by `get`.
pub fn credential_detail(result: &CredentialResult) -> String {
	let mut out = String::new();
	match result {
		CredentialResult::Simple(secret) => {
			let _ = writeln!(out, "{}", secret.name);
			let _ = writeln!(out, "  value: {}", display_opt(secret.value.as_deref()));
		}
		CredentialResult::Full(c) => {
			let _ = writeln!(out, "{}", c.name);
			let _ = writeln!(out, "  username: {}", display_opt(c.username.as_deref()));
			let _ = writeln!(out, "  password: {}", display_opt(c.password.as_deref()));
			let _ = writeln!(out, "  url:      {}", display_opt(c.url.as_deref()));
			let tags: Vec<&str> = c.tags.iter().map(String::as_str).collect();
			let _ = writeln!(out, "  tags:     {}", tags.join(", "));
			if !c.custom_properties.is_empty() {
				let _ = writeln!(out, "  properties:");
				for (key, value) in &c.custom_properties {
					let _ = writeln!(out, "    {key}={value}");
				}
			}
			if let Some(notes) = c.notes.as_deref().filter(|n| !n.trim().is_empty()) {
				let _ = writeln!(out, "  notes/comments:");
				for line in notes.lines() {
					let _ = writeln!(out, "    {line}");
				}
			}
		}
	}
	let _ = write!(out, "  version:  {}", result.version());
	out
}

/// One-line summary, as printed by `list`.
pub fn credential_line(result: &CredentialResult) -> String {
	match result {
		CredentialResult::Simple(secret) => format!(
			"- {} value={:?} v{}",
			secret.name,
			display_opt(secret.value.as_deref()),
			secret.version
		),
		CredentialResult::Full(c) => {
			let tags: Vec<&str> = c.tags.iter().map(String::as_str).collect();
			let mut line = format!(
				"- {} user={:?} url={:?} pwd={:?} tags=[{}] v{}",
				c.name,
				display_opt(c.username.as_deref()),
				display_opt(c.url.as_deref()),
				display_opt(c.password.as_deref()),
				tags.join(", "),
				c.version
			);
			if let Some(first) = c
				.notes
				.as_deref()
				.and_then(|n| n.trim().lines().next())
				.filter(|l| !l.is_empty())
			{
				let _ = write!(line, " notes={first:?}");
			}
			line
		}
	}
}

/// Version numbers zero-padded the way they appear in entry titles.
pub fn padded_versions(versions: &[u64], pad_width: usize) -> Vec<String> {
	versions
		.iter()
		.map(|v| format!("{v:0width$}", width = pad_width))
		.collect()
}

/// `s3-config` output. The secret key is shown only on request.
pub fn s3_config_detail(config: &S3ClientConfig, show_secret: bool) -> String {
	let secret = if show_secret {
		config.secret_access_key.expose().as_str()
	} else {
		REDACTED
	};
	format!(
		"endpoint_url:      {}\naccess_key_id:     {}\nsecret_access_key: {}\nregion:            {}\naddressing_style:  {}\nsignature_version: {}\nmax_attempts:      {}",
		config.endpoint_url,
		config.access_key_id,
		secret,
		config.region,
		config.addressing_style,
		config.signature_version,
		config.max_attempts
	)
}

/// JSON form of `s3-config`. `S3ClientConfig` redacts its secret when
/// serialized, so a revealed secret is patched in afterwards.
pub fn s3_config_json(config: &S3ClientConfig, show_secret: bool) -> Result<String> {
	let mut value = serde_json::to_value(config)?;
	if show_secret {
		value["secret_access_key"] =
			serde_json::Value::String(config.secret_access_key.expose().clone());
	}
	to_json(&value)
}

fn display_opt(value: Option<&str>) -> &str {
	value.unwrap_or("")
}
