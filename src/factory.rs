//! Migration file generation.
//!
//! Turns a human-readable name into a timestamp-prefixed, snake_cased
//! `.sql` stub with empty `up`/`down` sections ready to fill in.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::Result;
use crate::script::{DOWN_MARKER, UP_MARKER};

/// Generates the 14-digit `YYYYMMDDHHMMSS` timestamp for the current
/// instant.
#[must_use]
pub fn generate_timestamp() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Converts a human-readable name to snake_case: a lowercase-then-uppercase
/// boundary gains a `_`, whitespace and hyphen runs collapse to a single
/// `_`, and everything is lowercased.
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_lower_or_digit = false;
    let mut prev_underscore = false;

    for ch in name.trim().chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            if !prev_underscore && !out.is_empty() {
                out.push('_');
                prev_underscore = true;
            }
            prev_lower_or_digit = false;
            continue;
        }
        if ch.is_uppercase() {
            if prev_lower_or_digit && !prev_underscore {
                out.push('_');
            }
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            prev_lower_or_digit = false;
        } else {
            out.push(ch);
            prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
        }
        prev_underscore = false;
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Creates a new migration stub in `directory`, returning its path.
///
/// The directory is created recursively if absent. Two migrations authored
/// within the same second share a filename and the later write wins; the
/// fixed-width timestamp makes that the only collision case.
pub fn create_migration_file(directory: &Path, human_name: &str) -> Result<PathBuf> {
    let timestamp = generate_timestamp();
    let file_name = format!("{timestamp}_{}.sql", to_snake_case(human_name));
    let path = directory.join(file_name);

    std::fs::create_dir_all(directory)?;
    std::fs::write(&path, stub_body(human_name))?;
    Ok(path)
}

fn stub_body(human_name: &str) -> String {
    format!(
        "-- Migration: {human_name}\n\
         -- Created at: {}\n\
         \n\
         {UP_MARKER}\n\
         -- SQL to apply the migration goes here.\n\
         \n\
         {DOWN_MARKER}\n\
         -- SQL to revert the migration goes here.\n",
        Local::now().to_rfc3339()
    )
}
