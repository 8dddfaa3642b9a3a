//! Filesystem access used by the sorter.
//!
//! All listing and mutation goes through the [`FileSystem`] trait,
//! so planning and execution can run against a real directory or an in-memory tree.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::entry::Entry;
use crate::{is_directory_empty, path_to_string, print_warning};

/// Listing and mutation operations.
///
/// Mutations are blocking and applied one at a time.
pub trait FileSystem {
    /// List the direct children of a directory in no particular order.
    fn list_entries(&self, path: &Path) -> Result<Vec<Entry>>;

    /// Check if a regular file exists at the given path.
    fn is_file(&self, path: &Path) -> bool;

    /// Move a file or directory into the given directory, keeping its name.
    fn move_into(&mut self, source: &Path, directory: &Path) -> Result<()>;

    /// Create a directory. Succeeds if it already exists.
    fn create_dir(&mut self, path: &Path) -> Result<()>;

    /// Remove a directory if it contains nothing.
    fn remove_if_empty(&mut self, path: &Path) -> Result<()>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn list_entries(&self, path: &Path) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(path).with_context(|| format!("Failed to list {}", path.display()))? {
            let dir_entry = dir_entry?;
            let is_dir = dir_entry.file_type()?.is_dir();
            match dir_entry.file_name().into_string() {
                Ok(name) => entries.push(Entry::new(path, name, is_dir)),
                Err(name) => print_warning!("Skipping entry with invalid unicode name: {}", name.display()),
            }
        }
        Ok(entries)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn move_into(&mut self, source: &Path, directory: &Path) -> Result<()> {
        let name = source
            .file_name()
            .with_context(|| format!("Could not get name for path: {}", source.display()))?;
        let target = directory.join(name);
        if target.exists() {
            anyhow::bail!("Destination already exists: {}", path_to_string(&target));
        }
        fs::rename(source, &target).with_context(|| format!("Failed to move {}", source.display()))
    }

    fn create_dir(&mut self, path: &Path) -> Result<()> {
        if path.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(path).with_context(|| format!("Failed to create directory {}", path.display()))
    }

    fn remove_if_empty(&mut self, path: &Path) -> Result<()> {
        if !is_directory_empty(path) {
            anyhow::bail!("Directory is not empty: {}", path_to_string(path));
        }
        fs::remove_dir(path).with_context(|| format!("Failed to remove directory {}", path.display()))
    }
}
