// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
	#[error("vault not found at {}", path.display())]
	NotFound { path: PathBuf },

	#[error("vault already exists at {}", path.display())]
	AlreadyExists { path: PathBuf },

	#[error("invalid master password or tampered vault")]
	InvalidCredentials,

	#[error("vault is corrupt: {0}")]
	Corrupt(String),

	#[error("unsupported vault format version {0}")]
	UnsupportedVersion(u32),

	#[error("key derivation failed: {0}")]
	Kdf(String),

	#[error("encryption failed: {0}")]
	Encryption(String),

	#[error("entry already exists: {0}")]
	DuplicateTitle(String),

	#[error("entry not found: {0}")]
	EntryNotFound(String),

	#[error("injected failure: {0}")]
	Injected(&'static str),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl VaultError {
	/// Errors a caller can fix by supplying a different password.
	pub fn is_credential_error(&self) -> bool {
		matches!(self, Self::InvalidCredentials)
	}
}
