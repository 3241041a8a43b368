// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redaction of filesystem paths from error messages shown to callers.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static UNIX_PATH: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#"(^|[\s'"(=:])(/[\w.\-]+)+/?"#).expect("valid regex"));

static WINDOWS_PATH: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"[A-Za-z]:\\[\w\\.\-]+").expect("valid regex"));

/// Replace the vault path with `<database>`, the home directory with `~`,
/// and any other absolute path with `<path>`.
pub fn sanitize_message(message: &str, db_path: Option<&Path>) -> String {
	let mut out = message.to_string();

	if let Some(db_path) = db_path {
		let db = db_path.display().to_string();
		if !db.is_empty() {
			out = out.replace(&db, "<database>");
		}
	}

	if let Some(home) = dirs::home_dir() {
		let home = home.display().to_string();
		if home.len() > 1 {
			out = out.replace(&home, "~");
		}
	}

	let out = UNIX_PATH.replace_all(&out, "${1}<path>");
	WINDOWS_PATH.replace_all(&out, "<path>").into_owned()
}
