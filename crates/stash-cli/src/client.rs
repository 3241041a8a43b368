// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP client for a remote `stash-server`.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use anyhow::Context;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stash_common_secret::SecretString;
use stash_core::CredentialResult;
use thiserror::Error;
use url::Url;

const API_KEY_HEADER: &str = "X-API-Key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
	#[error("server unreachable: {0}")]
	Unreachable(String),

	#[error("not found: {0}")]
	NotFound(String),

	#[error("server returned {status}: {message}")]
	Api { status: StatusCode, message: String },

	#[error("unexpected response from server: {0}")]
	Decode(String),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PutRequest {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub password: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	#[serde(skip_serializing_if = "BTreeSet::is_empty")]
	pub tags: BTreeSet<String>,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub custom_properties: BTreeMap<String, String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PutResponse {
	pub name: String,
	pub version: u64,
	pub created: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub version: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
	credentials: Vec<CredentialResult>,
	#[allow(dead_code)]
	count: usize,
}

#[derive(Debug, Deserialize)]
struct VersionsResponse {
	versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DbUrlResponse {
	url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
	message: String,
}

pub struct ServerClient {
	base_url: Url,
	http: reqwest::Client,
	api_key: Option<SecretString>,
}

impl ServerClient {
	pub fn new(base_url: &str) -> anyhow::Result<Self> {
		let base_url = Url::parse(base_url).context("invalid server URL")?;
		if base_url.cannot_be_a_base() {
			anyhow::bail!("invalid server URL: {base_url}");
		}
		let http = reqwest::Client::builder()
			.user_agent(concat!("stash/", env!("CARGO_PKG_VERSION")))
			.timeout(REQUEST_TIMEOUT)
			.build()
			.context("failed to build HTTP client")?;
		Ok(Self {
			base_url,
			http,
			api_key: None,
		})
	}

	pub fn with_api_key(mut self, key: SecretString) -> Self {
		self.api_key = Some(key);
		self
	}

	pub async fn health(&self) -> Result<HealthResponse, ClientError> {
		let response = self.send(self.http.get(self.endpoint(&["api", "health"]))).await?;
		decode(check(response).await?).await
	}

	pub async fn list(
		&self,
		prefix: Option<&str>,
		show_password: bool,
	) -> Result<Vec<CredentialResult>, ClientError> {
		let mut url = self.endpoint(&["api", "v1", "credentials"]);
		{
			let mut query = url.query_pairs_mut();
			if let Some(prefix) = prefix {
				query.append_pair("prefix", prefix);
			}
			query.append_pair("show_password", bool_param(show_password));
		}
		let response = self.send(self.http.get(url)).await?;
		let list: ListResponse = decode(check(response).await?).await?;
		Ok(list.credentials)
	}

	pub async fn get(
		&self,
		name: &str,
		version: Option<u64>,
		show_password: bool,
	) -> Result<Option<CredentialResult>, ClientError> {
		let mut url = self.endpoint(&["api", "v1", "credentials", name]);
		{
			let mut query = url.query_pairs_mut();
			if let Some(version) = version {
				query.append_pair("version", &version.to_string());
			}
			query.append_pair("show_password", bool_param(show_password));
		}
		let response = self.send(self.http.get(url)).await?;
		if response.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}
		decode(check(response).await?).await.map(Some)
	}

	pub async fn put(&self, name: &str, request: &PutRequest) -> Result<PutResponse, ClientError> {
		let url = self.endpoint(&["api", "v1", "credentials", name]);
		let response = self.send(self.http.post(url).json(request)).await?;
		decode(check(response).await?).await
	}

	pub async fn delete(&self, name: &str) -> Result<bool, ClientError> {
		let url = self.endpoint(&["api", "v1", "credentials", name]);
		let response = self.send(self.http.delete(url)).await?;
		if response.status() == StatusCode::NOT_FOUND {
			return Ok(false);
		}
		check(response).await?;
		Ok(true)
	}

	/// Version numbers of `name`, ascending. Empty when the name is unknown.
	pub async fn versions(&self, name: &str) -> Result<Vec<u64>, ClientError> {
		let url = self.endpoint(&["api", "v1", "credentials", name, "versions"]);
		let response = self.send(self.http.get(url)).await?;
		if response.status() == StatusCode::NOT_FOUND {
			return Ok(Vec::new());
		}
		let body: VersionsResponse = decode(check(response).await?).await?;
		body.versions
			.iter()
			.map(|v| {
				v.parse::<u64>()
					.map_err(|_| ClientError::Decode(format!("bad version '{v}'")))
			})
			.collect()
	}

	pub async fn db_url(
		&self,
		name: &str,
		driver: Option<&str>,
		database: Option<&str>,
		sslmode: Option<&str>,
		mask_password: bool,
	) -> Result<String, ClientError> {
		let mut url = self.endpoint(&["api", "v1", "db-url", name]);
		{
			let mut query = url.query_pairs_mut();
			if let Some(driver) = driver {
				query.append_pair("driver", driver);
			}
			if let Some(database) = database {
				query.append_pair("database", database);
			}
			if let Some(sslmode) = sslmode {
				query.append_pair("sslmode", sslmode);
			}
			query.append_pair("mask_password", bool_param(mask_password));
		}
		let response = self.send(self.http.get(url)).await?;
		if response.status() == StatusCode::NOT_FOUND {
			return Err(ClientError::NotFound(name.to_string()));
		}
		let body: DbUrlResponse = decode(check(response).await?).await?;
		Ok(body.url)
	}

	/// `base_url` with `segments` appended, each percent-encoded.
	fn endpoint(&self, segments: &[&str]) -> Url {
		let mut url = self.base_url.clone();
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}
		url
	}

	async fn send(&self, mut req: RequestBuilder) -> Result<Response, ClientError> {
		if let Some(key) = &self.api_key {
			req = req.header(API_KEY_HEADER, key.expose().as_str());
		} else {
			tracing::debug!("no API key configured for server request");
		}
		req.send()
			.await
			.map_err(|e| ClientError::Unreachable(e.without_url().to_string()))
	}
}

fn bool_param(value: bool) -> &'static str {
	if value {
		"true"
	} else {
		"false"
	}
}

async fn check(response: Response) -> Result<Response, ClientError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}
	let body = response.text().await.unwrap_or_default();
	let message = serde_json::from_str::<ErrorBody>(&body)
		.map(|e| e.message)
		.unwrap_or(body);
	Err(ClientError::Api { status, message })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
	response
		.json()
		.await
		.map_err(|e| ClientError::Decode(e.without_url().to_string()))
}
