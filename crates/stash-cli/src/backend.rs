// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where credential commands run: the local vault or a remote server.

use anyhow::Result;
use stash_core::{
	CredentialInput, CredentialResult, DbUrlOptions, MaskMode, PutOutcome, Stash,
};

use crate::client::{PutRequest, ServerClient};

/// Fields for a `put`, independent of the backend.
#[derive(Debug, Clone, Default)]
pub struct PutPayload {
	pub request: PutRequest,
}

impl PutPayload {
	/// Convert to the core input. A simple value lands in the password field.
	pub fn into_input(self) -> CredentialInput {
		let PutRequest {
			value,
			username,
			password,
			url,
			notes,
			tags,
			custom_properties,
			version: _,
		} = self.request;
		CredentialInput {
			username,
			password: value.or(password).map(Into::into),
			url,
			notes,
			tags,
			custom_properties,
		}
	}
}

pub enum Backend {
	Local(Box<Stash>),
	Remote(ServerClient),
}

impl Backend {
	pub async fn list(
		&mut self,
		prefix: Option<&str>,
		show_password: bool,
	) -> Result<Vec<CredentialResult>> {
		match self {
			Self::Local(stash) => Ok(stash.list(prefix, show_password)?),
			Self::Remote(client) => Ok(client.list(prefix, show_password).await?),
		}
	}

	pub async fn keys(&mut self, prefix: Option<&str>) -> Result<Vec<String>> {
		match self {
			Self::Local(stash) => Ok(stash.keys(prefix)?),
			Self::Remote(client) => Ok(client
				.list(prefix, false)
				.await?
				.iter()
				.map(|c| c.name().to_string())
				.collect()),
		}
	}

	pub async fn get(
		&mut self,
		name: &str,
		version: Option<u64>,
		show_password: bool,
	) -> Result<Option<CredentialResult>> {
		match self {
			Self::Local(stash) => Ok(stash.get(name, version, show_password)?),
			Self::Remote(client) => Ok(client.get(name, version, show_password).await?),
		}
	}

	pub async fn put(&mut self, name: &str, payload: PutPayload) -> Result<PutOutcome> {
		match self {
			Self::Local(stash) => {
				let version = payload.request.version;
				Ok(stash.put_outcome(name, payload.into_input(), version)?)
			}
			Self::Remote(client) => {
				let response = client.put(name, &payload.request).await?;
				Ok(PutOutcome {
					version: response.version,
					created: response.created,
				})
			}
		}
	}

	pub async fn delete(&mut self, name: &str) -> Result<bool> {
		match self {
			Self::Local(stash) => Ok(stash.delete(name)?),
			Self::Remote(client) => Ok(client.delete(name).await?),
		}
	}

	pub async fn versions(&mut self, name: &str) -> Result<Vec<u64>> {
		match self {
			Self::Local(stash) => Ok(stash.versions(name)?),
			Self::Remote(client) => Ok(client.versions(name).await?),
		}
	}

	/// `mask_password` omits the password locally; the server substitutes
	/// its mask instead.
	pub async fn db_url(
		&mut self,
		name: &str,
		mut options: DbUrlOptions,
		mask_password: bool,
	) -> Result<String> {
		match self {
			Self::Local(stash) => {
				options.mask = if mask_password {
					MaskMode::Omit
				} else {
					MaskMode::Reveal
				};
				Ok(stash.db_url(name, &options)?)
			}
			Self::Remote(client) => Ok(client
				.db_url(
					name,
					options.driver.as_deref(),
					options.database.as_deref(),
					options.sslmode_override.as_deref(),
					mask_password,
				)
				.await?),
		}
	}

	/// The local stash, for commands that only make sense against a vault
	/// file.
	pub fn local(&mut self, command: &str) -> Result<&mut Stash> {
		match self {
			Self::Local(stash) => Ok(stash),
			Self::Remote(_) => anyhow::bail!("'{command}' is not available with --server-url"),
		}
	}
}
