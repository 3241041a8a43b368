// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Encrypted single-file vault engine.
//!
//! On-disk layout is a JSON envelope:
//!
//! ```text
//! {
//!   "format": "stash-vault",
//!   "version": 1,
//!   "kdf": { "algorithm": "argon2id", "salt": "<b64>", "mem_cost_kib": 19456,
//!            "time_cost": 2, "parallelism": 1 },
//!   "nonce": "<b64>",
//!   "ciphertext": "<b64 AES-256-GCM of the JSON entry list>"
//! }
//! ```
//!
//! Saves go to a sibling temporary file which is then renamed over the vault,
//! so a crash mid-write leaves the previous vault intact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use stash_common_secret::SecretString;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::contents::VaultContents;
use crate::crypto::{self, KEY_SIZE, SALT_SIZE};
use crate::entry::{Entry, EntryFields};
use crate::error::{VaultError, VaultResult};
use crate::{VaultEngine, VaultHandle};

const FORMAT: &str = "stash-vault";
const FORMAT_VERSION: u32 = 1;
const KDF_ALGORITHM: &str = "argon2id";
const AAD: &[u8] = b"stash-vault/v1";

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
	pub mem_cost_kib: u32,
	pub time_cost: u32,
	pub parallelism: u32,
}

impl Default for KdfParams {
	/// Argon2id with ~19 MiB memory, 2 passes, 1 lane.
	fn default() -> Self {
		Self {
			mem_cost_kib: 19_456,
			time_cost: 2,
			parallelism: 1,
		}
	}
}

impl KdfParams {
	/// Cheapest parameters Argon2 accepts. Only for tests.
	pub fn minimal() -> Self {
		Self {
			mem_cost_kib: 64,
			time_cost: 1,
			parallelism: 1,
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
struct KdfHeader {
	algorithm: String,
	salt: String,
	mem_cost_kib: u32,
	time_cost: u32,
	parallelism: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
	format: String,
	version: u32,
	kdf: KdfHeader,
	nonce: String,
	ciphertext: String,
}

/// Vault engine backed by encrypted files.
#[derive(Debug, Clone, Default)]
pub struct FileVault {
	kdf: KdfParams,
}

impl FileVault {
	pub fn new() -> Self {
		Self::default()
	}

	/// Use custom KDF costs for newly created or re-keyed vaults.
	///
	/// Existing vaults are always opened with the parameters recorded in their
	/// envelope.
	pub fn with_kdf_params(kdf: KdfParams) -> Self {
		Self { kdf }
	}
}

impl VaultEngine for FileVault {
	fn exists(&self, path: &Path) -> bool {
		path.is_file()
	}

	#[instrument(skip(self, path, password), fields(path = %path.display()))]
	fn open(&self, path: &Path, password: &SecretString) -> VaultResult<Box<dyn VaultHandle>> {
		let raw = match fs::read(path) {
			Ok(raw) => raw,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(VaultError::NotFound {
					path: path.to_path_buf(),
				});
			}
			Err(e) => return Err(e.into()),
		};

		let envelope: Envelope = serde_json::from_slice(&raw)
			.map_err(|e| VaultError::Corrupt(format!("unreadable envelope: {e}")))?;
		if envelope.format != FORMAT {
			return Err(VaultError::Corrupt(format!(
				"unexpected format '{}'",
				envelope.format
			)));
		}
		if envelope.version != FORMAT_VERSION {
			return Err(VaultError::UnsupportedVersion(envelope.version));
		}
		if envelope.kdf.algorithm != KDF_ALGORITHM {
			return Err(VaultError::Corrupt(format!(
				"unsupported kdf '{}'",
				envelope.kdf.algorithm
			)));
		}

		let salt = decode_field("salt", &envelope.kdf.salt)?;
		let salt: [u8; SALT_SIZE] = salt
			.try_into()
			.map_err(|_| VaultError::Corrupt("salt has wrong length".to_string()))?;
		let nonce = decode_field("nonce", &envelope.nonce)?;
		let ciphertext = decode_field("ciphertext", &envelope.ciphertext)?;

		let kdf = KdfParams {
			mem_cost_kib: envelope.kdf.mem_cost_kib,
			time_cost: envelope.kdf.time_cost,
			parallelism: envelope.kdf.parallelism,
		};
		let key = derive(password, &salt, kdf)?;
		let plaintext = crypto::open(&key, &nonce, &ciphertext, AAD)?;
		let contents: VaultContents = serde_json::from_slice(&plaintext)
			.map_err(|e| VaultError::Corrupt(format!("unreadable payload: {e}")))?;

		debug!(entries = contents.entries.len(), "opened vault");
		Ok(Box::new(FileHandle {
			path: path.to_path_buf(),
			kdf,
			salt,
			key,
			contents,
		}))
	}

	#[instrument(skip(self, path, password), fields(path = %path.display()))]
	fn create_empty(
		&self,
		path: &Path,
		password: &SecretString,
	) -> VaultResult<Box<dyn VaultHandle>> {
		if path.exists() {
			return Err(VaultError::AlreadyExists {
				path: path.to_path_buf(),
			});
		}
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent)?;
		}

		let salt = crypto::generate_salt();
		let key = derive(password, &salt, self.kdf)?;
		let mut handle = FileHandle {
			path: path.to_path_buf(),
			kdf: self.kdf,
			salt,
			key,
			contents: VaultContents::default(),
		};
		handle.save()?;
		debug!("created empty vault");
		Ok(Box::new(handle))
	}

	fn remove(&self, path: &Path) -> VaultResult<()> {
		match fs::remove_file(path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}

struct FileHandle {
	path: PathBuf,
	kdf: KdfParams,
	salt: [u8; SALT_SIZE],
	key: Zeroizing<[u8; KEY_SIZE]>,
	contents: VaultContents,
}

impl VaultHandle for FileHandle {
	fn entries(&self) -> &[Entry] {
		&self.contents.entries
	}

	fn find_entry(&self, title: &str) -> Option<&Entry> {
		self.contents.find(title)
	}

	fn create_entry(&mut self, title: &str, fields: EntryFields) -> VaultResult<&Entry> {
		self.contents.create(title, fields)
	}

	fn update_entry(&mut self, title: &str, fields: EntryFields) -> VaultResult<&Entry> {
		self.contents.update(title, fields)
	}

	fn delete_entry(&mut self, title: &str) -> VaultResult<bool> {
		Ok(self.contents.delete(title))
	}

	fn change_password(&mut self, password: &SecretString) -> VaultResult<()> {
		let salt = crypto::generate_salt();
		self.key = derive(password, &salt, self.kdf)?;
		self.salt = salt;
		Ok(())
	}

	fn save(&mut self) -> VaultResult<()> {
		let plaintext = Zeroizing::new(serde_json::to_vec(&self.contents)?);
		let (nonce, ciphertext) = crypto::seal(&self.key, &plaintext, AAD)?;

		let envelope = Envelope {
			format: FORMAT.to_string(),
			version: FORMAT_VERSION,
			kdf: KdfHeader {
				algorithm: KDF_ALGORITHM.to_string(),
				salt: STANDARD.encode(self.salt),
				mem_cost_kib: self.kdf.mem_cost_kib,
				time_cost: self.kdf.time_cost,
				parallelism: self.kdf.parallelism,
			},
			nonce: STANDARD.encode(nonce),
			ciphertext: STANDARD.encode(ciphertext),
		};
		let bytes = serde_json::to_vec_pretty(&envelope)?;
		write_atomic_private(&self.path, &bytes)?;

		debug!(
			path = %self.path.display(),
			entries = self.contents.entries.len(),
			"saved vault"
		);
		Ok(())
	}
}

fn derive(
	password: &SecretString,
	salt: &[u8],
	kdf: KdfParams,
) -> VaultResult<Zeroizing<[u8; KEY_SIZE]>> {
	crypto::derive_key(
		password.expose().as_bytes(),
		salt,
		kdf.mem_cost_kib,
		kdf.time_cost,
		kdf.parallelism,
	)
}

fn decode_field(name: &str, value: &str) -> VaultResult<Vec<u8>> {
	STANDARD
		.decode(value)
		.map_err(|e| VaultError::Corrupt(format!("invalid base64 in {name}: {e}")))
}

/// Write `bytes` to a sibling temp file with owner-only permissions, then
/// rename it over `path`.
fn write_atomic_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
	let file_name = path
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_else(|| "vault".to_string());
	let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

	let result = (|| {
		let mut options = fs::OpenOptions::new();
		options.write(true).create(true).truncate(true);
		#[cfg(unix)]
		{
			use std::os::unix::fs::OpenOptionsExt;
			options.mode(0o600);
		}
		let mut file = options.open(&tmp_path)?;
		file.write_all(bytes)?;
		file.sync_all()?;
		fs::rename(&tmp_path, path)
	})();

	if result.is_err() {
		let _ = fs::remove_file(&tmp_path);
	}
	result
}
