// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! S3-compatible client settings from a stored credential.
//!
//! The credential's `url` is the endpoint, its username the access key id
//! and its password the secret key. Constructing an actual client is up to
//! the caller.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use stash_common_secret::SecretString;

use super::{fetch_credential, BuildError};
use crate::stash::Stash;

pub const DEFAULT_S3_REGION: &str = "us-east-1";
pub const DEFAULT_S3_SIGNATURE_VERSION: &str = "s3v4";
pub const DEFAULT_S3_MAX_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressingStyle {
	#[default]
	Path,
	Virtual,
}

impl fmt::Display for AddressingStyle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Path => write!(f, "path"),
			Self::Virtual => write!(f, "virtual"),
		}
	}
}

impl FromStr for AddressingStyle {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"path" => Ok(Self::Path),
			"virtual" => Ok(Self::Virtual),
			other => Err(format!("unknown addressing style '{other}', expected path or virtual")),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Options {
	pub region: String,
	pub addressing: AddressingStyle,
	pub signature_version: String,
	pub max_attempts: u32,
}

impl Default for S3Options {
	fn default() -> Self {
		Self {
			region: DEFAULT_S3_REGION.to_string(),
			addressing: AddressingStyle::Path,
			signature_version: DEFAULT_S3_SIGNATURE_VERSION.to_string(),
			max_attempts: DEFAULT_S3_MAX_ATTEMPTS,
		}
	}
}

/// Everything needed to construct an S3 client. The secret key serializes
/// redacted.
#[derive(Debug, Clone, Serialize)]
pub struct S3ClientConfig {
	pub endpoint_url: String,
	pub access_key_id: String,
	pub secret_access_key: SecretString,
	pub region: String,
	pub addressing_style: AddressingStyle,
	pub signature_version: String,
	pub max_attempts: u32,
}

pub fn build_s3_config(
	stash: &mut Stash,
	name: &str,
	options: &S3Options,
) -> Result<S3ClientConfig, BuildError> {
	let credential = fetch_credential(stash, name)?;
	let missing = |field| BuildError::MissingField {
		name: name.to_string(),
		field,
	};

	let endpoint = credential
		.url
		.as_deref()
		.map(str::trim)
		.filter(|u| !u.is_empty())
		.ok_or_else(|| missing("endpoint url"))?;
	let endpoint_url = if endpoint.contains("://") {
		endpoint.to_string()
	} else {
		format!("https://{endpoint}")
	};

	let access_key_id = credential
		.username
		.clone()
		.filter(|u| !u.is_empty())
		.ok_or_else(|| missing("access key id (username)"))?;
	let secret_access_key = credential
		.password
		.clone()
		.filter(|p| !p.is_empty())
		.map(SecretString::new)
		.ok_or_else(|| missing("secret access key (password)"))?;

	Ok(S3ClientConfig {
		endpoint_url,
		access_key_id,
		secret_access_key,
		region: options.region.clone(),
		addressing_style: options.addressing,
		signature_version: options.signature_version.clone(),
		max_attempts: options.max_attempts,
	})
}
