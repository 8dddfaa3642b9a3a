//! Filesystem entries under consideration for sorting.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;

use crate::{os_str_to_string, path_to_string};

/// One direct child of a sorted directory.
///
/// Two entries are the same entry when both `path` and `name` match.
/// The directory flag is not part of the identity.
#[derive(Debug, Clone, Eq)]
pub struct Entry {
    /// Containing directory.
    pub path: PathBuf,
    /// Base name, including the extension for files.
    pub name: String,
    pub is_dir: bool,
}

impl Entry {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            is_dir,
        }
    }

    #[must_use]
    pub fn file(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self::new(path, name, false)
    }

    #[must_use]
    pub fn directory(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self::new(path, name, true)
    }

    /// Full path of this entry.
    #[must_use]
    pub fn full_path(&self) -> PathBuf {
        self.path.join(&self.name)
    }

    /// String form used as the cluster key.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.name == other.name
    }
}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_path = path_to_string(&self.full_path());
        if self.is_dir && !full_path.ends_with(MAIN_SEPARATOR) {
            write!(f, "{full_path}{MAIN_SEPARATOR}")
        } else {
            write!(f, "{full_path}")
        }
    }
}

impl FromStr for Entry {
    type Err = anyhow::Error;

    /// Parse the string form back to an entry.
    /// A trailing path separator marks a directory.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let is_dir = value.ends_with(MAIN_SEPARATOR);
        let trimmed = value.trim_end_matches(MAIN_SEPARATOR);
        let full_path = Path::new(trimmed);
        let name = full_path
            .file_name()
            .map(os_str_to_string)
            .with_context(|| format!("Entry has no name: '{value}'"))?;
        let path = full_path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self { path, name, is_dir })
    }
}
