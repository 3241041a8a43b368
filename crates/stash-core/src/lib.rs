// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Versioned credential storage on top of a vault engine.
//!
//! Each logical credential name maps to one vault entry per version, titled
//! `<name>@@<zero-padded version>`. Entries whose titles do not follow that
//! shape are left alone.
//!
//! Layers, bottom up:
//!
//! - [`VersionCodec`] encodes and decodes entry titles
//! - [`CredentialStore`] owns the unlocked vault handle and an optional
//!   [`EntryCache`]
//! - [`EntryManager`] implements put/get/list/delete/versions
//! - [`PasswordResolver`] and [`Bootstrapper`] find or create the master
//!   password and the vault
//! - [`Stash`] ties them together for the CLI and the server
//!
//! ```no_run
//! use std::sync::Arc;
//! use stash_core::{CredentialInput, Stash, StashOptions};
//! use stash_vault::FileVault;
//!
//! # fn main() -> Result<(), stash_core::StashError> {
//! let mut stash = Stash::new(Arc::new(FileVault::new()), StashOptions::new("stash.vault"));
//! let version = stash.put("api-token", CredentialInput::value("sk-123"), None)?;
//! let latest = stash.get("api-token", None, true)?;
//! # let _ = (version, latest);
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod builders;
pub mod cache;
pub mod codec;
pub mod credential;
pub mod entries;
pub mod error;
pub mod password;
pub mod sanitize;
pub mod stash;
pub mod store;
pub mod validation;

pub use bootstrap::{check_sidecar_permissions, Bootstrapped, Bootstrapper};
pub use builders::{
	build_db_url, build_s3_config, AddressingStyle, BuildError, DbUrlOptions, MaskMode,
	S3ClientConfig, S3Options,
};
pub use cache::{CacheSettings, CacheStats, EntryCache};
pub use codec::{VersionCodec, DEFAULT_PAD_WIDTH, SEPARATOR};
pub use credential::{
	Credential, CredentialInput, CredentialResult, SimpleSecret, DEFAULT_PASSWORD_MASK,
};
pub use entries::{EntryManager, PutOutcome};
pub use error::{StashError, StashResult};
pub use password::{sidecar_path_for, PasswordResolver, PasswordSource};
pub use stash::{SetupOutcome, Stash, StashOptions};
pub use store::CredentialStore;
