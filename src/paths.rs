//! Database path resolution.
//!
//! Maps a logical database name (possibly containing `/` separators for
//! sub-scopes) plus an environment to the concrete location of the `.sqlite`
//! file. Resolution is a pure function of its inputs, with one escape hatch:
//! a name that is already an absolute path, or that points at an existing
//! file, is returned unchanged so pre-resolved and test paths pass through.

use std::path::{Path, PathBuf};

/// Extension appended to logical database names.
pub const DB_EXTENSION: &str = ".sqlite";

/// Storage environment, read from `APP_ENV` at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    /// Default when `APP_ENV` is unset.
    #[default]
    Development,
    /// Uses a temporary root so test databases never mix with real data.
    Test,
    /// Persistent production data root.
    Production,
    /// Any other partition name.
    Other(String),
}

impl Environment {
    /// Reads the environment from `APP_ENV`.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("APP_ENV")
            .map(|value| Self::from(value.as_str()))
            .unwrap_or_default()
    }

    /// The environment name as it appears in storage paths.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
            Self::Other(name) => name,
        }
    }

    /// Root storage directory for this environment. Test databases live
    /// under a temporary root; everything else under the persistent data
    /// root.
    #[must_use]
    pub fn root(&self) -> PathBuf {
        match self {
            Self::Test => PathBuf::from("tmp/sqlite/test"),
            other => Path::new("data/sqlite").join(other.as_str()),
        }
    }
}

impl From<&str> for Environment {
    fn from(value: &str) -> Self {
        match value {
            "development" => Self::Development,
            "test" => Self::Test,
            "production" => Self::Production,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Options for [`resolve`] and [`resolve_with_details`].
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Environment override; `APP_ENV` is consulted when absent.
    pub environment: Option<Environment>,
    /// Explicit root directory, replacing the environment root entirely.
    pub directory: Option<PathBuf>,
}

/// A resolved database location, split for callers that need to create the
/// directory before writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Full path to the `.sqlite` file.
    pub path: PathBuf,
    /// Directory holding the file.
    pub directory: PathBuf,
    /// File name including the `.sqlite` extension.
    pub file_name: String,
}

/// Resolves a logical database name to its file-system path.
#[must_use]
pub fn resolve(name_or_path: &str, options: &ResolveOptions) -> PathBuf {
    resolve_with_details(name_or_path, options).path
}

/// [`resolve`], additionally returning the split directory and filename.
#[must_use]
pub fn resolve_with_details(name_or_path: &str, options: &ResolveOptions) -> ResolvedPath {
    let candidate = Path::new(name_or_path);
    if candidate.is_absolute() || candidate.exists() {
        return split(candidate.to_path_buf());
    }

    let environment = options
        .environment
        .clone()
        .unwrap_or_else(Environment::from_env);
    let root = options
        .directory
        .clone()
        .unwrap_or_else(|| environment.root());

    let mut segments: Vec<&str> = name_or_path.split('/').filter(|s| !s.is_empty()).collect();
    let last = segments.pop().unwrap_or_default();
    let file_name = if last.ends_with(DB_EXTENSION) {
        last.to_string()
    } else {
        format!("{last}{DB_EXTENSION}")
    };

    let mut directory = root;
    for segment in segments {
        directory = directory.join(segment);
    }

    ResolvedPath {
        path: directory.join(&file_name),
        directory,
        file_name,
    }
}

fn split(path: PathBuf) -> ResolvedPath {
    let directory = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    ResolvedPath {
        path,
        directory,
        file_name,
    }
}
