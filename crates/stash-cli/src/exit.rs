// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process exit codes.

use std::process::ExitCode;

use stash_core::BuildError;
use thiserror::Error;

use crate::client::ClientError;

pub const EXIT_ERROR: u8 = 1;
pub const EXIT_NOT_FOUND: u8 = 2;
pub const EXIT_DEPENDENCY: u8 = 3;

/// A lookup found nothing. Reported as "not found: NAME".
#[derive(Debug, Error)]
#[error("not found: {0}")]
pub struct NotFound(pub String);

/// Map a command failure to its exit code.
///
/// Missing credentials exit 2. Failures of features built on top of stored
/// credentials (connection builders, the remote server) exit 3. Everything
/// else exits 1.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
	if err.downcast_ref::<NotFound>().is_some() {
		return EXIT_NOT_FOUND;
	}
	if let Some(err) = err.downcast_ref::<BuildError>() {
		return match err {
			BuildError::NotFound(_) => EXIT_NOT_FOUND,
			BuildError::Stash(_) => EXIT_ERROR,
			_ => EXIT_DEPENDENCY,
		};
	}
	if let Some(err) = err.downcast_ref::<ClientError>() {
		return match err {
			ClientError::NotFound(_) => EXIT_NOT_FOUND,
			ClientError::Unreachable(_) => EXIT_DEPENDENCY,
			ClientError::Api { status, .. } if status.is_server_error() => EXIT_DEPENDENCY,
			_ => EXIT_ERROR,
		};
	}
	EXIT_ERROR
}

pub fn exit_code(err: &anyhow::Error) -> ExitCode {
	ExitCode::from(exit_code_for(err))
}
