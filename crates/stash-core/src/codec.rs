// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mapping between logical credential names and physical entry titles.
//!
//! A title is `<name>@@<version>` with the version zero-padded to a fixed
//! width, so lexicographic order among a name's titles equals numeric order.
//! The format is persisted; changing the separator or the padding breaks
//! every existing vault.

use crate::error::{StashError, StashResult};
use crate::validation::validate_name;

/// Token joining a name to its version. Names may never contain it.
pub const SEPARATOR: &str = "@@";

pub const DEFAULT_PAD_WIDTH: usize = 10;

/// Widest padding accepted. Every `u64` fits in 20 digits.
pub const MAX_PAD_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionCodec {
	pad_width: usize,
}

impl Default for VersionCodec {
	fn default() -> Self {
		Self {
			pad_width: DEFAULT_PAD_WIDTH,
		}
	}
}

impl VersionCodec {
	pub fn new(pad_width: usize) -> StashResult<Self> {
		if pad_width == 0 || pad_width > MAX_PAD_WIDTH {
			return Err(StashError::invalid_field(
				"pad_width",
				format!("must be between 1 and {MAX_PAD_WIDTH}, got {pad_width}"),
			));
		}
		Ok(Self { pad_width })
	}

	pub fn pad_width(&self) -> usize {
		self.pad_width
	}

	/// Largest version representable at this width.
	pub fn max_version(&self) -> u64 {
		10u64
			.checked_pow(self.pad_width as u32)
			.map(|limit| limit - 1)
			.unwrap_or(u64::MAX)
	}

	/// Render a version as its zero-padded suffix.
	pub fn pad(&self, version: u64) -> StashResult<String> {
		if version == 0 {
			return Err(StashError::invalid_field("version", "versions start at 1"));
		}
		if version > self.max_version() {
			return Err(StashError::invalid_field(
				"version",
				format!(
					"{version} does not fit in {} digits",
					self.pad_width
				),
			));
		}
		Ok(format!("{version:0width$}", width = self.pad_width))
	}

	pub fn encode(&self, name: &str, version: u64) -> StashResult<String> {
		validate_name(name)?;
		Ok(format!("{name}{SEPARATOR}{}", self.pad(version)?))
	}

	/// Split a title into `(name, version)`.
	///
	/// Returns `None` for titles that are not version-managed: no separator,
	/// a suffix that is not exactly `pad_width` digits, version zero, or an
	/// empty name. Such entries coexist in the vault and are ignored.
	pub fn decode<'a>(&self, title: &'a str) -> Option<(&'a str, u64)> {
		let (name, suffix) = title.rsplit_once(SEPARATOR)?;
		if name.is_empty()
			|| suffix.len() != self.pad_width
			|| !suffix.bytes().all(|b| b.is_ascii_digit())
		{
			return None;
		}
		match suffix.parse::<u64>() {
			Ok(0) | Err(_) => None,
			Ok(version) => Some((name, version)),
		}
	}

	pub fn next_version(existing: impl IntoIterator<Item = u64>) -> u64 {
		existing
			.into_iter()
			.max()
			.map(|v| v.saturating_add(1))
			.unwrap_or(1)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_encode_default_width() {
		let codec = VersionCodec::default();
		assert_eq!(codec.encode("name", 123).unwrap(), "name@@0000000123");
	}

	#[test]
	fn test_encode_rejects_separator_in_name() {
		let codec = VersionCodec::default();
		let err = codec.encode("bad@@name", 1).unwrap_err();
		assert!(matches!(err, StashError::InvalidName(_)));
	}

	#[test]
	fn test_encode_rejects_version_zero_and_overflow() {
		let codec = VersionCodec::new(2).unwrap();
		assert!(codec.encode("a", 0).is_err());
		assert!(codec.encode("a", 99).is_ok());
		assert!(matches!(
			codec.encode("a", 100),
			Err(StashError::InvalidField { field: "version", .. })
		));
	}

	#[test]
	fn test_new_rejects_bad_width() {
		assert!(VersionCodec::new(0).is_err());
		assert!(VersionCodec::new(21).is_err());
		assert_eq!(VersionCodec::new(20).unwrap().max_version(), u64::MAX);
	}

	#[test]
	fn test_decode_uses_last_separator() {
		let codec = VersionCodec::default();
		assert_eq!(codec.decode("api@@0000000007"), Some(("api", 7)));
		// Only reachable for titles written by something else.
		assert_eq!(codec.decode("a@@b@@0000000002"), Some(("a@@b", 2)));
	}

	#[test]
	fn test_decode_ignores_unmanaged_titles() {
		let codec = VersionCodec::default();
		assert_eq!(codec.decode("plain title"), None);
		assert_eq!(codec.decode("api@@7"), None);
		assert_eq!(codec.decode("api@@00000000007"), None);
		assert_eq!(codec.decode("api@@00000000x7"), None);
		assert_eq!(codec.decode("api@@+000000007"), None);
		assert_eq!(codec.decode("api@@0000000000"), None);
		assert_eq!(codec.decode("@@0000000001"), None);
	}

	#[test]
	fn test_next_version() {
		assert_eq!(VersionCodec::next_version([]), 1);
		assert_eq!(VersionCodec::next_version([1, 2, 3]), 4);
		assert_eq!(VersionCodec::next_version([5, 2]), 6);
	}

	mod proptests {
		use super::*;
		use proptest::prelude::*;

		fn valid_name() -> impl Strategy<Value = String> {
			"[a-zA-Z0-9_][a-zA-Z0-9_ .:-]{0,40}"
				.prop_filter("no separator", |s| !s.contains(SEPARATOR) && !s.trim().is_empty())
		}

		proptest! {
			#[test]
			fn prop_roundtrip(name in valid_name(), version in 1u64..=9_999_999_999) {
				let codec = VersionCodec::default();
				let title = codec.encode(&name, version).unwrap();
				prop_assert_eq!(codec.decode(&title), Some((name.as_str(), version)));
			}

			#[test]
			fn prop_padding_preserves_order(a in 1u64..=9_999_999_999, b in 1u64..=9_999_999_999) {
				prop_assume!(a < b);
				let codec = VersionCodec::default();
				prop_assert!(codec.pad(a).unwrap() < codec.pad(b).unwrap());
			}

			#[test]
			fn prop_next_version_exceeds_all(existing in proptest::collection::btree_set(1u64..10_000, 0..20)) {
				let next = VersionCodec::next_version(existing.iter().copied());
				prop_assert!(existing.iter().all(|v| *v < next));
			}
		}
	}
}
