// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for credential operations.
//!
//! "Not found" is deliberately absent: a missing name is reported through
//! `Option`/`bool` return values, never as an error.

use std::path::PathBuf;

use thiserror::Error;

pub type StashResult<T> = Result<T, StashError>;

#[derive(Debug, Error)]
pub enum StashError {
	/// The logical credential name violates the naming rules.
	#[error("invalid credential name: {0}")]
	InvalidName(String),

	/// A payload field violates its length or charset limits.
	#[error("invalid {field}: {message}")]
	InvalidField {
		field: &'static str,
		message: String,
	},

	/// The vault could not be opened. The message has filesystem paths redacted.
	#[error("credential store unavailable: {0}")]
	StoreUnavailable(String),

	/// A save failed after the change was applied in memory.
	#[error("failed to write credential store: {0}")]
	StoreWrite(String),

	/// Exactly one of the vault and its sidecar password file exists.
	#[error("{}", describe_inconsistency(*database_exists, *sidecar_exists))]
	BootstrapInconsistentState {
		database_exists: bool,
		sidecar_exists: bool,
	},

	#[error("no master password available: {0}")]
	PasswordUnavailable(String),

	#[error("I/O error on {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

impl StashError {
	pub fn invalid_name(message: impl Into<String>) -> Self {
		Self::InvalidName(message.into())
	}

	pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
		Self::InvalidField {
			field,
			message: message.into(),
		}
	}

	pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Self::Io {
			path: path.into(),
			source,
		}
	}

	/// Input errors the caller must fix; retrying unchanged will fail again.
	pub fn is_validation(&self) -> bool {
		matches!(self, Self::InvalidName(_) | Self::InvalidField { .. })
	}
}

fn describe_inconsistency(database_exists: bool, sidecar_exists: bool) -> String {
	match (database_exists, sidecar_exists) {
		(true, false) => "inconsistent bootstrap state: the vault exists but its sidecar password \
			 file is missing; supply the password explicitly or run setup --force"
			.to_string(),
		(false, true) => "inconsistent bootstrap state: a sidecar password file exists without a \
			 vault; remove it or run setup --force"
			.to_string(),
		_ => "inconsistent bootstrap state".to_string(),
	}
}
