//! Pairwise similarity scoring and ranking.

use std::collections::HashSet;
use std::fmt;

use indicatif::ProgressBar;
#[cfg(not(test))]
use indicatif::ProgressStyle;
use rayon::prelude::*;

use crate::entry::Entry;
use crate::tokenize::tokenize;

#[cfg(not(test))]
const PROGRESS_BAR_CHARS: &str = "=> ";
#[cfg(not(test))]
const PROGRESS_BAR_TEMPLATE: &str = "Analyzing [{elapsed_precise}] {bar:60.cyan/blue} {percent}%";

/// Jaccard similarity of two token sets as a percentage.
///
/// Two empty sets have similarity 0.
#[must_use]
pub fn score(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64 * 100.0
}

/// Similarity of two entries computed from their token sets.
#[must_use]
pub fn similarity(a: &Entry, b: &Entry) -> f64 {
    score(&tokenize(a), &tokenize(b))
}

/// A scored pair of entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult<'a> {
    pub x: &'a Entry,
    pub y: &'a Entry,
    /// Similarity in the range 0..=100.
    pub factor: f64,
}

impl<'a> ComparisonResult<'a> {
    #[must_use]
    pub const fn new(x: &'a Entry, y: &'a Entry, factor: f64) -> Self {
        Self { x, y, factor }
    }
}

impl fmt::Display for ComparisonResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:6.2}%] {} <-> {}", self.factor, self.x, self.y)
    }
}

/// Produces every eligible entry pair ordered by descending similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairRanker {
    consider_file_pairs: bool,
    consider_dir_pairs: bool,
}

impl PairRanker {
    #[must_use]
    pub const fn new(consider_file_pairs: bool, consider_dir_pairs: bool) -> Self {
        Self {
            consider_file_pairs,
            consider_dir_pairs,
        }
    }

    const fn should_compare(&self, x: &Entry, y: &Entry) -> bool {
        match (x.is_dir, y.is_dir) {
            (false, false) => self.consider_file_pairs,
            (true, true) => self.consider_dir_pairs,
            _ => true,
        }
    }

    /// Score all unordered pairs once and sort by similarity, highest first.
    ///
    /// In each pair `x` is the entry listed first.
    /// Pairs with equal similarity keep the listing order.
    #[must_use]
    pub fn rank<'a>(&self, entries: &'a [Entry]) -> Vec<ComparisonResult<'a>> {
        let tokens: Vec<HashSet<String>> = entries.par_iter().map(tokenize).collect();
        let progress_bar = create_progress_bar(entries.len() as u64);

        let mut results: Vec<ComparisonResult<'a>> = (0..entries.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                let x = &entries[i];
                let row: Vec<ComparisonResult<'a>> = entries
                    .iter()
                    .enumerate()
                    .skip(i + 1)
                    .filter(|(_, y)| x != *y && self.should_compare(x, y))
                    .map(|(j, y)| ComparisonResult::new(x, y, score(&tokens[i], &tokens[j])))
                    .collect();
                progress_bar.inc(1);
                row
            })
            .collect();

        progress_bar.finish_and_clear();

        // Stable sort keeps the sequential evaluation order for ties
        results.sort_by(|a, b| b.factor.total_cmp(&a.factor));
        results
    }
}

/// Create a progress bar that is hidden during tests.
fn create_progress_bar(len: u64) -> ProgressBar {
    #[cfg(test)]
    {
        let _ = len;
        ProgressBar::hidden()
    }
    #[cfg(not(test))]
    {
        let progress_bar = ProgressBar::new(len);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template(PROGRESS_BAR_TEMPLATE)
                .expect("Failed to set progress bar template")
                .progress_chars(PROGRESS_BAR_CHARS),
        );
        progress_bar
    }
}
