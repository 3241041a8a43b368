// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential CRUD handlers.

use std::collections::{BTreeMap, BTreeSet};

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	Json,
};
use serde::{Deserialize, Serialize};
use stash_core::{CredentialInput, CredentialResult, StashError};
use tracing::info;

use crate::error::ServerError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
	pub prefix: Option<String>,
	#[serde(default)]
	pub show_password: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct GetQuery {
	pub version: Option<u64>,
	#[serde(default)]
	pub show_password: bool,
}

/// Body of a create request. `value` stores a simple secret; the other
/// fields store a full credential.
#[derive(Debug, Default, Deserialize)]
pub struct CreateCredentialRequest {
	pub value: Option<String>,
	pub username: Option<String>,
	pub password: Option<String>,
	pub url: Option<String>,
	pub notes: Option<String>,
	#[serde(default)]
	pub tags: BTreeSet<String>,
	#[serde(default)]
	pub custom_properties: BTreeMap<String, String>,
	pub version: Option<u64>,
}

impl CreateCredentialRequest {
	fn into_input(self) -> Result<(CredentialInput, Option<u64>), ServerError> {
		if self.value.is_some()
			&& (self.username.is_some() || self.password.is_some() || self.url.is_some())
		{
			return Err(ServerError::BadRequest(
				"'value' cannot be combined with username, password or url".to_string(),
			));
		}
		let input = CredentialInput {
			username: self.username,
			password: self.value.or(self.password).map(Into::into),
			url: self.url,
			notes: self.notes,
			tags: self.tags,
			custom_properties: self.custom_properties,
		};
		Ok((input, self.version))
	}
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialListResponse {
	pub credentials: Vec<CredentialResult>,
	pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCredentialResponse {
	pub name: String,
	pub version: u64,
	pub created: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteCredentialResponse {
	pub name: String,
	pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionListResponse {
	pub name: String,
	pub versions: Vec<String>,
	pub latest: String,
}

/// GET /api/v1/credentials
pub async fn list_credentials(
	State(state): State<AppState>,
	Query(query): Query<ListQuery>,
) -> Result<Json<CredentialListResponse>, ServerError> {
	let credentials = state
		.with_stash(move |stash| stash.list(query.prefix.as_deref(), query.show_password))
		.await?;
	Ok(Json(CredentialListResponse {
		count: credentials.len(),
		credentials,
	}))
}

/// GET /api/v1/credentials/{name}
pub async fn get_credential(
	State(state): State<AppState>,
	Path(name): Path<String>,
	Query(query): Query<GetQuery>,
) -> Result<Json<CredentialResult>, ServerError> {
	let lookup = name.clone();
	state
		.with_stash(move |stash| stash.get(&lookup, query.version, query.show_password))
		.await?
		.map(Json)
		.ok_or_else(|| ServerError::credential_not_found(&name))
}

/// POST /api/v1/credentials/{name} - 201 for a new version, 200 when an
/// explicit version was overwritten in place.
pub async fn create_credential(
	State(state): State<AppState>,
	Path(name): Path<String>,
	Json(body): Json<CreateCredentialRequest>,
) -> Result<(StatusCode, Json<CreateCredentialResponse>), ServerError> {
	let (input, version) = body.into_input()?;
	let target = name.clone();
	let outcome = state
		.with_stash(move |stash| stash.put_outcome(&target, input, version))
		.await?;

	info!(name = %name, version = outcome.version, created = outcome.created, "credential stored");
	let status = if outcome.created {
		StatusCode::CREATED
	} else {
		StatusCode::OK
	};
	Ok((
		status,
		Json(CreateCredentialResponse {
			name,
			version: outcome.version,
			created: outcome.created,
		}),
	))
}

/// DELETE /api/v1/credentials/{name}
pub async fn delete_credential(
	State(state): State<AppState>,
	Path(name): Path<String>,
) -> Result<Json<DeleteCredentialResponse>, ServerError> {
	let target = name.clone();
	let deleted = state.with_stash(move |stash| stash.delete(&target)).await?;
	if !deleted {
		return Err(ServerError::credential_not_found(&name));
	}
	info!(name = %name, "credential deleted");
	Ok(Json(DeleteCredentialResponse {
		name,
		deleted: true,
	}))
}

/// GET /api/v1/credentials/{name}/versions
pub async fn list_versions(
	State(state): State<AppState>,
	Path(name): Path<String>,
) -> Result<Json<VersionListResponse>, ServerError> {
	let target = name.clone();
	let (versions, pad_width) = state
		.with_stash(move |stash| {
			let versions = stash.versions(&target)?;
			Ok::<_, StashError>((versions, stash.options().pad_width))
		})
		.await?;

	let versions: Vec<String> = versions
		.iter()
		.map(|v| format!("{v:0width$}", width = pad_width))
		.collect();
	let Some(latest) = versions.last().cloned() else {
		return Err(ServerError::credential_not_found(&name));
	};
	Ok(Json(VersionListResponse {
		name,
		versions,
		latest,
	}))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_value_request_is_a_simple_secret() {
		let request = CreateCredentialRequest {
			value: Some("token".into()),
			notes: Some("ci".into()),
			..Default::default()
		};
		let (input, version) = request.into_input().unwrap();
		assert_eq!(input.password.unwrap().expose(), "token");
		assert!(input.username.is_none());
		assert_eq!(version, None);
	}

	#[test]
	fn test_value_conflicts_with_full_fields() {
		let request = CreateCredentialRequest {
			value: Some("token".into()),
			username: Some("admin".into()),
			..Default::default()
		};
		assert!(matches!(
			request.into_input(),
			Err(ServerError::BadRequest(_))
		));
	}

	#[test]
	fn test_request_body_accepts_tags_and_properties() {
		let request: CreateCredentialRequest = serde_json::from_value(serde_json::json!({
			"username": "app",
			"password": "pw",
			"tags": ["prod", "db"],
			"custom_properties": {"database": "orders"},
			"version": 4
		}))
		.unwrap();
		let (input, version) = request.into_input().unwrap();
		assert_eq!(input.tags.len(), 2);
		assert_eq!(input.custom_properties["database"], "orders");
		assert_eq!(version, Some(4));
	}
}
