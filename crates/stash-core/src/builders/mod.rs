// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Connection settings derived from stored credentials.
//!
//! Builders only consume [`Stash::get`]; they never touch the vault directly.

mod db_url;
mod s3;

pub use db_url::{build_db_url, DbUrlOptions, MaskMode, DEFAULT_DB_DRIVER};
pub use s3::{
	build_s3_config, AddressingStyle, S3ClientConfig, S3Options, DEFAULT_S3_MAX_ATTEMPTS,
	DEFAULT_S3_REGION, DEFAULT_S3_SIGNATURE_VERSION,
};

use thiserror::Error;

use crate::credential::{Credential, CredentialResult};
use crate::error::StashError;
use crate::stash::Stash;

#[derive(Debug, Error)]
pub enum BuildError {
	#[error("credential not found: {0}")]
	NotFound(String),

	#[error("credential '{0}' is a simple secret and cannot be used as a connection")]
	SimpleSecret(String),

	#[error("credential '{name}' has no {field}")]
	MissingField { name: String, field: &'static str },

	#[error("database endpoint must include a port (e.g. host:5432)")]
	MissingPort,

	#[error("invalid database port '{0}'")]
	InvalidPort(String),

	#[error("invalid database endpoint: {0}")]
	InvalidEndpoint(String),

	#[error("missing database name: pass one explicitly or set the 'database' or 'dbname' property")]
	MissingDatabase,

	#[error(transparent)]
	Stash(#[from] StashError),
}

impl BuildError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound(_))
	}
}

/// Latest version of `name` with the secret revealed, which must be a
/// structured credential.
fn fetch_credential(stash: &mut Stash, name: &str) -> Result<Credential, BuildError> {
	match stash.get(name, None, true)? {
		None => Err(BuildError::NotFound(name.to_string())),
		Some(CredentialResult::Simple(_)) => Err(BuildError::SimpleSecret(name.to_string())),
		Some(CredentialResult::Full(credential)) => Ok(credential),
	}
}
