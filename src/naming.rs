//! Name new directories after the words their members share.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use itertools::Itertools;

use crate::entry::Entry;
use crate::fs_ops::FileSystem;
use crate::tokenize::{split_words, tokenize};

/// Joins the parts of a new directory name.
pub const NEW_DIR_SEPARATOR: &str = "_";

#[derive(Debug, Clone, Default)]
pub struct DirectorySynthesizer {
    prefix: Option<String>,
}

impl DirectorySynthesizer {
    /// An empty prefix is the same as no prefix.
    #[must_use]
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix: prefix.filter(|prefix| !prefix.is_empty()),
        }
    }

    /// Infer the target directory for a cluster of entry keys.
    ///
    /// The member with the fewest tokens names the directory,
    /// which is placed next to the first member.
    /// Returns `None` when no usable name remains.
    ///
    /// # Errors
    /// Returns an error if a cluster key is not a valid entry.
    pub fn synthesize<F: FileSystem>(
        &self,
        cluster: &BTreeSet<String>,
        file_system: &F,
    ) -> Result<Option<(Entry, Vec<Entry>)>> {
        let members: Vec<Entry> = cluster.iter().map(|key| key.parse()).collect::<Result<_>>()?;
        let Some(template) = members.iter().min_by_key(|member| tokenize(member).len()) else {
            return Ok(None);
        };

        let name = self.directory_name(template);
        if name.is_empty() {
            return Ok(None);
        }

        let path = members[0].path.clone();
        let name = Self::unique_name(&path, name, file_system);
        Ok(Some((Entry::directory(path, name), members)))
    }

    /// Build a directory name from the words of the template that survive tokenizing,
    /// keeping their original case and order.
    #[must_use]
    pub fn directory_name(&self, template: &Entry) -> String {
        let tokens = tokenize(template);
        self.prefix
            .as_deref()
            .into_iter()
            .chain(split_words(&template.name).filter(|word| tokens.contains(&word.to_lowercase())))
            .join(NEW_DIR_SEPARATOR)
    }

    /// Append a running number if a file already uses the name.
    fn unique_name<F: FileSystem>(path: &Path, name: String, file_system: &F) -> String {
        if !file_system.is_file(&path.join(&name)) {
            return name;
        }
        (0_usize..)
            .map(|suffix| format!("{name}{NEW_DIR_SEPARATOR}{suffix}"))
            .find(|candidate| !file_system.is_file(&path.join(candidate)))
            .unwrap_or(name)
    }
}
