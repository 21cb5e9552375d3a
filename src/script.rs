//! Migration script loading and validation.
//!
//! A migration is a `.sql` file named `<14-digit timestamp>_<snake_case>.sql`
//! carrying two marked sections, `-- migrate:up` and `-- migrate:down`. The
//! loader validates the whole contract up front and produces a
//! [`MigrationScript`] value; a file missing either section is rejected even
//! when only one direction is about to run, so malformed migrations fail
//! fast instead of surfacing mid-revert.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{MigrateError, Result};
use crate::tracker;

/// Marker opening the forward section.
pub const UP_MARKER: &str = "-- migrate:up";
/// Marker opening the revert section.
pub const DOWN_MARKER: &str = "-- migrate:down";

/// Which of a migration's two operations to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Direction {
    /// Apply the migration.
    Up,
    /// Revert the migration.
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// A loaded, validated migration script.
#[derive(Debug, Clone)]
pub struct MigrationScript {
    /// Where the script was loaded from.
    pub path: PathBuf,
    /// The 14-digit timestamp key from the filename.
    pub timestamp: String,
    /// Statements of the `up` section, in order.
    pub up: Vec<String>,
    /// Statements of the `down` section, in order.
    pub down: Vec<String>,
}

impl MigrationScript {
    /// Loads and validates a script file.
    pub fn load(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let timestamp = tracker::extract_timestamp(&file_name)?;
        let body = std::fs::read_to_string(path)?;

        let (up_sql, down_sql) = split_sections(&body, path)?;
        Ok(Self {
            path: path.to_path_buf(),
            timestamp,
            up: split_statements(&up_sql),
            down: split_statements(&down_sql),
        })
    }

    /// Statements for the requested direction.
    #[must_use]
    pub fn statements(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }
}

/// Splits a script body into its `up` and `down` sections.
///
/// Both markers must be present; text before the first marker (headers,
/// comments) is ignored.
fn split_sections(body: &str, path: &Path) -> Result<(String, String)> {
    let mut up: Option<String> = None;
    let mut down: Option<String> = None;
    let mut current: Option<&mut String> = None;

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case(UP_MARKER) {
            current = Some(up.get_or_insert_with(String::new));
        } else if trimmed.eq_ignore_ascii_case(DOWN_MARKER) {
            current = Some(down.get_or_insert_with(String::new));
        } else if let Some(section) = current.as_deref_mut() {
            section.push_str(line);
            section.push('\n');
        }
    }

    let up = up.ok_or_else(|| MigrateError::MissingDirection {
        file: path.to_path_buf(),
        direction: "up",
    })?;
    let down = down.ok_or_else(|| MigrateError::MissingDirection {
        file: path.to_path_buf(),
        direction: "down",
    })?;
    Ok((up, down))
}

/// Splits a section into individual statements.
///
/// Semicolons terminate statements only at nesting depth zero, so trigger
/// bodies (`BEGIN ... END;`) and `CASE ... END` expressions stay intact.
/// String literals and line comments are skipped when tracking depth, and
/// chunks that contain no SQL (whitespace or comments only) are dropped.
pub(crate) fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut chars = sql.chars().peekable();
    let mut word = String::new();

    let flush_word = |word: &mut String, depth: &mut i32| {
        if word.eq_ignore_ascii_case("begin") || word.eq_ignore_ascii_case("case") {
            *depth += 1;
        } else if word.eq_ignore_ascii_case("end") {
            *depth = (*depth - 1).max(0);
        }
        word.clear();
    };

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                flush_word(&mut word, &mut depth);
                current.push(ch);
                // Consume the literal, honoring '' escapes.
                while let Some(inner) = chars.next() {
                    current.push(inner);
                    if inner == '\'' {
                        if chars.peek() == Some(&'\'') {
                            current.push(chars.next().expect("peeked quote"));
                        } else {
                            break;
                        }
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                flush_word(&mut word, &mut depth);
                current.push(ch);
                for comment in chars.by_ref() {
                    current.push(comment);
                    if comment == '\n' {
                        break;
                    }
                }
            }
            ';' => {
                flush_word(&mut word, &mut depth);
                if depth == 0 {
                    push_statement(&mut statements, &mut current);
                } else {
                    current.push(ch);
                }
            }
            _ => {
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    word.push(ch);
                } else {
                    flush_word(&mut word, &mut depth);
                }
                current.push(ch);
            }
        }
    }
    flush_word(&mut word, &mut depth);
    push_statement(&mut statements, &mut current);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let text = std::mem::take(current);
    let trimmed = text.trim();
    if has_sql_content(trimmed) {
        statements.push(trimmed.to_string());
    }
}

/// Whether a chunk contains anything beyond whitespace and `--` comments.
fn has_sql_content(chunk: &str) -> bool {
    chunk
        .lines()
        .any(|line| !line.trim().is_empty() && !line.trim().starts_with("--"))
}
