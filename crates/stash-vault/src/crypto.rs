// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key derivation and payload encryption for file vaults.
//!
//! The master password is stretched with Argon2id into a 256-bit key, which
//! seals the serialized vault contents with AES-256-GCM. Every save draws a
//! fresh random nonce.

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng, Payload},
	Aes256Gcm, Key, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};

/// Size of the derived key in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the Argon2 salt in bytes.
pub const SALT_SIZE: usize = 16;

pub fn generate_salt() -> [u8; SALT_SIZE] {
	let mut salt = [0u8; SALT_SIZE];
	OsRng.fill_bytes(&mut salt);
	salt
}

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
	let mut nonce = [0u8; NONCE_SIZE];
	OsRng.fill_bytes(&mut nonce);
	nonce
}

/// Derive the vault key from a password with Argon2id.
pub fn derive_key(
	password: &[u8],
	salt: &[u8],
	mem_cost_kib: u32,
	time_cost: u32,
	parallelism: u32,
) -> VaultResult<Zeroizing<[u8; KEY_SIZE]>> {
	let params = Params::new(mem_cost_kib, time_cost, parallelism, Some(KEY_SIZE))
		.map_err(|e| VaultError::Kdf(e.to_string()))?;
	let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	argon2
		.hash_password_into(password, salt, key.as_mut())
		.map_err(|e| VaultError::Kdf(e.to_string()))?;
	Ok(key)
}

/// Encrypt `plaintext`, binding it to `aad`. Returns the nonce and ciphertext.
pub fn seal(
	key: &[u8; KEY_SIZE],
	plaintext: &[u8],
	aad: &[u8],
) -> VaultResult<([u8; NONCE_SIZE], Vec<u8>)> {
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
	let nonce_bytes = generate_nonce();
	let ciphertext = cipher
		.encrypt(
			Nonce::from_slice(&nonce_bytes),
			Payload {
				msg: plaintext,
				aad,
			},
		)
		.map_err(|e| VaultError::Encryption(e.to_string()))?;
	Ok((nonce_bytes, ciphertext))
}

/// Decrypt a sealed payload.
///
/// Authentication failure is reported as [`VaultError::InvalidCredentials`]:
/// a wrong password and a tampered file are indistinguishable here.
pub fn open(
	key: &[u8; KEY_SIZE],
	nonce: &[u8],
	ciphertext: &[u8],
	aad: &[u8],
) -> VaultResult<Zeroizing<Vec<u8>>> {
	if nonce.len() != NONCE_SIZE {
		return Err(VaultError::Corrupt(format!(
			"nonce must be {NONCE_SIZE} bytes, got {}",
			nonce.len()
		)));
	}
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
	let plaintext = cipher
		.decrypt(
			Nonce::from_slice(nonce),
			Payload {
				msg: ciphertext,
				aad,
			},
		)
		.map_err(|_| VaultError::InvalidCredentials)?;
	Ok(Zeroizing::new(plaintext))
}
