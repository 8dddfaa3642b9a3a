//! Turn ranked entry pairs into filesystem actions.
//!
//! Pairs are consumed from the most similar down and processing stops at the first
//! pair below the threshold. Directory pairs become merges and file-directory pairs
//! become moves right away. File pairs have no destination yet, so they are collected
//! into clusters afterwards and each cluster gets a new directory.

use std::collections::{BTreeSet, HashSet};

use anyhow::Result;

use crate::confirm::Confirm;
use crate::entry::Entry;
use crate::executor::ActionExecutor;
use crate::fs_ops::FileSystem;
use crate::naming::DirectorySynthesizer;
use crate::similarity::ComparisonResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    /// Move a file into an existing directory.
    MoveFile { source: Entry, destination: Entry },
    /// Move the contents of one directory into another and remove the emptied source.
    MergeDirectories { source: Entry, destination: Entry },
    /// Create a directory and move the files into it.
    CreateDirectoryAndMove { directory: Entry, files: Vec<Entry> },
}

impl PlannedAction {
    /// Entries this action would move.
    #[must_use]
    pub fn sources(&self) -> Vec<&Entry> {
        match self {
            Self::MoveFile { source, .. } | Self::MergeDirectories { source, .. } => vec![source],
            Self::CreateDirectoryAndMove { files, .. } => files.iter().collect(),
        }
    }
}

/// Greedy planner that owns the used-as-source registry and the clusters for one run.
#[derive(Debug, Default)]
pub struct ClusterPlanner {
    threshold: f64,
    used_sources: HashSet<Entry>,
    clusters: Vec<BTreeSet<String>>,
}

impl ClusterPlanner {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Register an entry as committed source.
    ///
    /// # Errors
    /// Returns an error if the entry was already used as a source,
    /// which means it would be moved twice.
    pub fn mark_used(&mut self, entry: &Entry) -> Result<()> {
        if !self.used_sources.insert(entry.clone()) {
            anyhow::bail!("Internal error: source already processed: {entry}");
        }
        Ok(())
    }

    #[must_use]
    pub fn is_used(&self, entry: &Entry) -> bool {
        self.used_sources.contains(entry)
    }

    /// Index of the cluster containing the given entry key.
    #[must_use]
    pub fn cluster_of(&self, key: &str) -> Option<usize> {
        self.clusters.iter().position(|cluster| cluster.contains(key))
    }

    pub fn add_to_cluster(&mut self, index: usize, key: String) {
        if let Some(cluster) = self.clusters.get_mut(index) {
            cluster.insert(key);
        }
    }

    pub fn new_cluster(&mut self, first: String, second: String) {
        self.clusters.push(BTreeSet::from([first, second]));
    }

    #[must_use]
    pub fn clusters(&self) -> &[BTreeSet<String>] {
        &self.clusters
    }

    /// Plan and execute actions for the ranked pairs.
    ///
    /// Returns every action that was handed to the executor, in order.
    ///
    /// # Errors
    /// Returns an error if an entry would be used as a source twice,
    /// or if confirmation or cluster naming fails.
    pub fn run<F: FileSystem, C: Confirm>(
        &mut self,
        ranked: &[ComparisonResult<'_>],
        executor: &mut ActionExecutor<F, C>,
        synthesizer: &DirectorySynthesizer,
    ) -> Result<Vec<PlannedAction>> {
        let mut planned = Vec::new();
        let mut file_pairs: Vec<&ComparisonResult<'_>> = Vec::new();

        for result in ranked {
            if result.factor < self.threshold || executor.is_aborted() {
                break;
            }
            let action = match (result.x.is_dir, result.y.is_dir) {
                (true, true) => self.merge_candidate(result.x, result.y),
                (false, true) => self.move_candidate(result.x, result.y),
                (true, false) => self.move_candidate(result.y, result.x),
                (false, false) => {
                    file_pairs.push(result);
                    None
                }
            };
            if let Some(action) = action {
                self.commit(action, result.factor, executor, &mut planned)?;
            }
        }

        self.build_clusters(&file_pairs);

        for cluster in self.clusters.clone() {
            if executor.is_aborted() {
                break;
            }
            let Some((directory, members)) = synthesizer.synthesize(&cluster, executor.file_system())? else {
                continue;
            };
            let files: Vec<Entry> = members.into_iter().filter(|member| !self.is_used(member)).collect();
            if files.is_empty() {
                continue;
            }
            let action = PlannedAction::CreateDirectoryAndMove { directory, files };
            self.commit(action, self.threshold, executor, &mut planned)?;
        }

        Ok(planned)
    }

    /// Group file pairs into clusters in descending similarity order.
    ///
    /// An unclustered entry joins the cluster of its partner.
    /// Two existing clusters are never merged.
    pub fn build_clusters(&mut self, file_pairs: &[&ComparisonResult<'_>]) {
        for result in file_pairs {
            if self.is_used(result.x) || self.is_used(result.y) {
                continue;
            }
            let x_key = result.x.key();
            let y_key = result.y.key();
            match (self.cluster_of(&x_key), self.cluster_of(&y_key)) {
                (Some(_), Some(_)) => {}
                (Some(index), None) => self.add_to_cluster(index, y_key),
                (None, Some(index)) => self.add_to_cluster(index, x_key),
                (None, None) => self.new_cluster(x_key, y_key),
            }
        }
    }

    fn merge_candidate(&self, source: &Entry, destination: &Entry) -> Option<PlannedAction> {
        (!self.is_used(source)).then(|| PlannedAction::MergeDirectories {
            source: source.clone(),
            destination: destination.clone(),
        })
    }

    fn move_candidate(&self, file: &Entry, directory: &Entry) -> Option<PlannedAction> {
        (!self.is_used(file)).then(|| PlannedAction::MoveFile {
            source: file.clone(),
            destination: directory.clone(),
        })
    }

    fn commit<F: FileSystem, C: Confirm>(
        &mut self,
        action: PlannedAction,
        factor: f64,
        executor: &mut ActionExecutor<F, C>,
        planned: &mut Vec<PlannedAction>,
    ) -> Result<()> {
        if let Some(source) = action.sources().into_iter().find(|source| self.is_used(source)) {
            anyhow::bail!("Internal error: source already processed: {source}");
        }
        for source in executor.execute(&action, factor)? {
            self.mark_used(&source)?;
        }
        planned.push(action);
        Ok(())
    }
}

#[cfg(test)]
mod planner_tests {
    use super::*;

    use crate::confirm::AutoConfirm;
    use crate::executor::{ActionRecord, ActionStatus};
    use crate::fs_ops::memory::MemoryFileSystem;
    use crate::similarity::PairRanker;

    const THRESHOLD: f64 = 50.0;

    struct Run {
        planned: Vec<PlannedAction>,
        log: Vec<ActionRecord>,
        fs: MemoryFileSystem,
    }

    fn memory_fs(dirs: &[&str], files: &[&str]) -> MemoryFileSystem {
        let mut fs = MemoryFileSystem::with_root("/media");
        for dir in dirs {
            fs.add_dir(format!("/media/{dir}"));
        }
        for file in files {
            fs.add_file(format!("/media/{file}"));
        }
        fs
    }

    fn run_planner(fs: MemoryFileSystem, ranker: PairRanker, simulate: bool) -> Run {
        let entries = fs.list_entries("/media".as_ref()).expect("should list");
        let ranked = ranker.rank(&entries);
        let mut executor = ActionExecutor::new(fs, AutoConfirm::new(THRESHOLD), simulate);
        let planned = ClusterPlanner::new(THRESHOLD)
            .run(&ranked, &mut executor, &DirectorySynthesizer::default())
            .expect("planner should succeed");
        let fs = executor.file_system().clone();
        Run {
            planned,
            log: executor.into_log(),
            fs,
        }
    }

    #[test]
    fn similar_files_get_new_directory() {
        let fs = memory_fs(&[], &["Alpha.S01E01.mkv", "Alpha.S01E02.mkv"]);
        let run = run_planner(fs, PairRanker::new(true, false), false);

        assert_eq!(
            run.planned,
            vec![PlannedAction::CreateDirectoryAndMove {
                directory: Entry::directory("/media", "Alpha"),
                files: vec![
                    Entry::file("/media", "Alpha.S01E01.mkv"),
                    Entry::file("/media", "Alpha.S01E02.mkv"),
                ],
            }]
        );
        assert_eq!(run.log.len(), 2);
        assert!(run.fs.exists("/media/Alpha/Alpha.S01E01.mkv"));
        assert!(run.fs.exists("/media/Alpha/Alpha.S01E02.mkv"));
    }

    #[test]
    fn file_pairs_are_ignored_when_disabled() {
        let fs = memory_fs(&[], &["Alpha.S01E01.mkv", "Alpha.S01E02.mkv"]);
        let run = run_planner(fs, PairRanker::new(false, false), false);
        assert!(run.planned.is_empty());
        assert!(run.log.is_empty());
    }

    #[test]
    fn file_moves_into_matching_directory() {
        let fs = memory_fs(&["Alpha"], &["Alpha.S01E03.mkv"]);
        let run = run_planner(fs, PairRanker::new(false, false), false);

        assert_eq!(
            run.planned,
            vec![PlannedAction::MoveFile {
                source: Entry::file("/media", "Alpha.S01E03.mkv"),
                destination: Entry::directory("/media", "Alpha"),
            }]
        );
        assert!(run.fs.exists("/media/Alpha/Alpha.S01E03.mkv"));
    }

    #[test]
    fn file_is_source_even_when_listed_second() {
        let alpha = Entry::directory("/media", "Alpha");
        let file = Entry::file("/media", "Alpha.S01E03.mkv");
        let ranked = vec![ComparisonResult::new(&alpha, &file, 100.0)];
        let fs = memory_fs(&["Alpha"], &["Alpha.S01E03.mkv"]);
        let mut executor = ActionExecutor::new(fs, AutoConfirm::new(THRESHOLD), false);
        let planned = ClusterPlanner::new(THRESHOLD)
            .run(&ranked, &mut executor, &DirectorySynthesizer::default())
            .expect("planner should succeed");

        assert_eq!(
            planned,
            vec![PlannedAction::MoveFile {
                source: file.clone(),
                destination: alpha.clone(),
            }]
        );
    }

    #[test]
    fn source_is_never_used_twice() {
        // "Alpha" scores 100 and "Alpha Show" scores 50, both pass the threshold
        let fs = memory_fs(&["Alpha", "Alpha Show"], &["Alpha.S01E03.mkv"]);
        let run = run_planner(fs, PairRanker::new(false, false), false);

        assert_eq!(run.log.len(), 1);
        assert_eq!(run.log[0].destination, Entry::directory("/media", "Alpha"));
        assert!(run.fs.exists("/media/Alpha/Alpha.S01E03.mkv"));
    }

    #[test]
    fn failed_source_is_not_retried() {
        let mut fs = memory_fs(&["Alpha", "Alpha Show"], &["Alpha.S01E03.mkv"]);
        fs.fail_moves_from("/media/Alpha.S01E03.mkv");
        let run = run_planner(fs, PairRanker::new(false, false), false);

        assert_eq!(run.log.len(), 1);
        assert!(matches!(run.log[0].status, ActionStatus::Failed(_)));
    }

    #[test]
    fn stops_at_first_pair_below_threshold() {
        let fs = memory_fs(&["Alpha Show Extras Bonus"], &["Alpha.S01E03.mkv"]);
        let run = run_planner(fs, PairRanker::new(false, false), false);
        assert!(run.planned.is_empty());
        assert!(run.fs.exists("/media/Alpha.S01E03.mkv"));
    }

    #[test]
    fn similar_directories_are_merged() {
        let mut fs = memory_fs(&["Alpha Show", "Alpha.Show"], &[]);
        fs.add_file("/media/Alpha Show/one.mkv");
        let run = run_planner(fs, PairRanker::new(false, true), false);

        assert_eq!(
            run.planned,
            vec![PlannedAction::MergeDirectories {
                source: Entry::directory("/media", "Alpha Show"),
                destination: Entry::directory("/media", "Alpha.Show"),
            }]
        );
        assert!(run.fs.exists("/media/Alpha.Show/one.mkv"));
        assert!(!run.fs.exists("/media/Alpha Show"));
    }

    #[test]
    fn merged_directory_is_not_merged_again() {
        let a = Entry::directory("/media", "Alpha A");
        let b = Entry::directory("/media", "Alpha B");
        let c = Entry::directory("/media", "Alpha C");
        let ranked = vec![ComparisonResult::new(&a, &b, 90.0), ComparisonResult::new(&a, &c, 80.0)];
        let fs = memory_fs(&["Alpha A", "Alpha B", "Alpha C"], &[]);
        let mut executor = ActionExecutor::new(fs, AutoConfirm::new(THRESHOLD), false);
        let planned = ClusterPlanner::new(THRESHOLD)
            .run(&ranked, &mut executor, &DirectorySynthesizer::default())
            .expect("planner should succeed");

        assert_eq!(planned.len(), 1);
        assert_eq!(executor.log().len(), 1);
    }

    #[test]
    fn moved_files_are_left_out_of_clusters() {
        let fs = memory_fs(&["Alpha"], &["Alpha.S01E01.mkv", "Alpha.S01E02.mkv"]);
        let run = run_planner(fs, PairRanker::new(true, false), false);

        assert_eq!(run.planned.len(), 2);
        assert!(
            run.planned
                .iter()
                .all(|action| matches!(action, PlannedAction::MoveFile { .. }))
        );
        assert!(run.fs.exists("/media/Alpha/Alpha.S01E01.mkv"));
        assert!(run.fs.exists("/media/Alpha/Alpha.S01E02.mkv"));
    }

    #[test]
    fn simulation_matches_real_run() {
        let dirs = ["Alpha", "Beta Show", "Beta.Show"];
        let files = ["Alpha.S01E03.mkv", "Gamma.S01E01.mkv", "Gamma.S01E02.mkv", "Other.txt"];
        let real = run_planner(memory_fs(&dirs, &files), PairRanker::new(true, true), false);
        let simulated = run_planner(memory_fs(&dirs, &files), PairRanker::new(true, true), true);

        assert_eq!(real.planned, simulated.planned);
        assert_eq!(real.log.len(), simulated.log.len());
        for (real, simulated) in real.log.iter().zip(&simulated.log) {
            assert_eq!(real.source, simulated.source);
            assert_eq!(real.destination, simulated.destination);
            assert_eq!(simulated.status, ActionStatus::Simulated);
        }
        assert_eq!(simulated.fs.mutations, 0);
        assert!(simulated.fs.exists("/media/Alpha.S01E03.mkv"));
    }

    #[test]
    fn mark_used_rejects_reuse() {
        let mut planner = ClusterPlanner::new(THRESHOLD);
        let entry = Entry::file("/media", "Alpha.mkv");
        planner.mark_used(&entry).expect("first use is fine");
        assert!(planner.is_used(&entry));
        assert!(planner.mark_used(&entry).is_err());
    }

    #[test]
    fn used_source_is_rejected_before_anything_moves() {
        let fs = memory_fs(&["Alpha"], &["Alpha.S01E03.mkv"]);
        let mut executor = ActionExecutor::new(fs, AutoConfirm::new(THRESHOLD), false);
        let mut planner = ClusterPlanner::new(THRESHOLD);
        let source = Entry::file("/media", "Alpha.S01E03.mkv");
        planner.mark_used(&source).expect("first use is fine");

        let action = PlannedAction::MoveFile {
            source,
            destination: Entry::directory("/media", "Alpha"),
        };
        let mut planned = Vec::new();
        assert!(planner.commit(action, 100.0, &mut executor, &mut planned).is_err());
        assert!(planned.is_empty());
        assert!(executor.log().is_empty());
        assert_eq!(executor.file_system().mutations, 0);
        assert!(executor.file_system().exists("/media/Alpha.S01E03.mkv"));
    }

    #[test]
    fn sources_lists_moved_entries() {
        let file = Entry::file("/media", "Alpha.S01E01.mkv");
        let other = Entry::file("/media", "Alpha.S01E02.mkv");
        let action = PlannedAction::CreateDirectoryAndMove {
            directory: Entry::directory("/media", "Alpha"),
            files: vec![file.clone(), other.clone()],
        };
        assert_eq!(action.sources(), vec![&file, &other]);
    }

    fn files(names: &[&str]) -> Vec<Entry> {
        names.iter().map(|name| Entry::file("/media", *name)).collect()
    }

    #[test]
    fn clusters_grow_but_never_merge() {
        let entries = files(&["a", "b", "c", "d", "e"]);
        let [a, b, c, d, e] = [&entries[0], &entries[1], &entries[2], &entries[3], &entries[4]];
        let pairs = [
            ComparisonResult::new(a, b, 100.0),
            ComparisonResult::new(c, d, 90.0),
            ComparisonResult::new(b, c, 80.0),
            ComparisonResult::new(e, a, 70.0),
        ];
        let refs: Vec<&ComparisonResult<'_>> = pairs.iter().collect();

        let mut planner = ClusterPlanner::new(THRESHOLD);
        planner.build_clusters(&refs);

        assert_eq!(planner.clusters().len(), 2);
        assert_eq!(planner.cluster_of(&a.key()), Some(0));
        assert_eq!(planner.cluster_of(&b.key()), Some(0));
        assert_eq!(planner.cluster_of(&e.key()), Some(0));
        assert_eq!(planner.cluster_of(&c.key()), Some(1));
        assert_eq!(planner.cluster_of(&d.key()), Some(1));
        assert_eq!(planner.clusters()[0].len(), 3);
    }

    #[test]
    fn clusters_skip_used_entries() {
        let entries = files(&["a", "b", "c"]);
        let pairs = [
            ComparisonResult::new(&entries[0], &entries[1], 100.0),
            ComparisonResult::new(&entries[1], &entries[2], 90.0),
        ];
        let refs: Vec<&ComparisonResult<'_>> = pairs.iter().collect();

        let mut planner = ClusterPlanner::new(THRESHOLD);
        planner.mark_used(&entries[0]).expect("first use is fine");
        planner.build_clusters(&refs);

        assert_eq!(planner.clusters().len(), 1);
        assert_eq!(planner.cluster_of(&entries[0].key()), None);
        assert_eq!(planner.cluster_of(&entries[2].key()), Some(0));
    }
}
