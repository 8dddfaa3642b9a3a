//! Top level run: list, rank, plan, execute, and report.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use colored::Colorize;
use itertools::Itertools;

use crate::config::Config;
use crate::confirm::{AutoConfirm, Confirm, Prompt};
use crate::entry::Entry;
use crate::executor::{ActionExecutor, ActionRecord, print_report};
use crate::fs_ops::{FileSystem, LocalFileSystem};
use crate::logger::FileLogger;
use crate::naming::DirectorySynthesizer;
use crate::planner::ClusterPlanner;
use crate::print_warning;
use crate::similarity::{ComparisonResult, PairRanker};
use crate::tokenize::tokenize;

/// Number of ranked pairs printed in debug mode.
const DEBUG_PAIR_COUNT: usize = 20;

pub struct DirSort {
    config: Config,
    abort_flag: Arc<AtomicBool>,
}

impl DirSort {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            abort_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an interrupt flag, for example one set from a Ctrl+C handler.
    #[must_use]
    pub fn with_abort_flag(mut self, abort_flag: Arc<AtomicBool>) -> Self {
        self.abort_flag = abort_flag;
        self
    }

    /// Sort the configured roots on the local filesystem, print the report,
    /// and write the log file if enabled.
    ///
    /// # Errors
    /// Returns an error if listing a root or asking for confirmation fails.
    pub fn run(&self) -> Result<Vec<ActionRecord>> {
        if self.config.dryrun {
            println!("{}", "Running in dryrun mode".yellow());
        }
        if self.config.debug {
            println!("{}", self.config);
        }

        let mut logger = if self.config.log {
            match FileLogger::new() {
                Ok(logger) => Some(logger),
                Err(error) => {
                    print_warning!("Failed to create log file: {error}");
                    None
                }
            }
        } else {
            None
        };
        if let Some(logger) = logger.as_mut() {
            logger.log_init(&self.config);
        }

        let log = self.sort(LocalFileSystem)?;
        print_report(&log);

        if let Some(logger) = logger.as_mut() {
            logger.log_actions(&log);
            logger.log_summary(&log, self.is_aborted());
        }
        Ok(log)
    }

    /// Sort the configured roots on the given filesystem and return the action log.
    ///
    /// # Errors
    /// Returns an error if listing a root or asking for confirmation fails.
    pub fn sort<F: FileSystem>(&self, file_system: F) -> Result<Vec<ActionRecord>> {
        let entries = self.collect_entries(&file_system)?;
        if entries.len() < 2 {
            if self.config.verbose {
                println!("Nothing to compare");
            }
            return Ok(Vec::new());
        }

        let ranked = PairRanker::new(self.config.files, self.config.directories).rank(&entries);
        if self.config.debug {
            self.print_debug_info(&entries, &ranked);
        }

        if self.config.auto || self.config.dryrun {
            self.execute(&ranked, file_system, AutoConfirm::new(self.config.factor))
        } else {
            self.execute(&ranked, file_system, Prompt::stdin(self.config.factor))
        }
    }

    fn execute<F: FileSystem, C: Confirm>(
        &self,
        ranked: &[ComparisonResult<'_>],
        file_system: F,
        confirm: C,
    ) -> Result<Vec<ActionRecord>> {
        let mut executor =
            ActionExecutor::new(file_system, confirm, self.config.dryrun).with_abort_flag(Arc::clone(&self.abort_flag));
        let synthesizer = DirectorySynthesizer::new(self.config.prefix.clone());
        let mut planner = ClusterPlanner::new(self.config.factor);
        let planned = match planner.run(ranked, &mut executor, &synthesizer) {
            Ok(planned) => planned,
            Err(error) => {
                print_report(executor.log());
                return Err(error);
            }
        };

        if self.config.verbose {
            println!("Planned {} action(s)", planned.len());
        }
        if executor.is_aborted() {
            print_warning!("Interrupted, stopped before remaining actions");
        }
        Ok(executor.into_log())
    }

    /// List the direct children of every root, applying include and exclude filters.
    ///
    /// Entries are sorted by name within each root so runs are repeatable.
    fn collect_entries<F: FileSystem>(&self, file_system: &F) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for root in &self.config.roots {
            let mut listed = file_system.list_entries(root)?;
            listed.sort_by(|a, b| a.name.cmp(&b.name));
            for entry in listed {
                if self.config.is_included(&entry.name) {
                    entries.push(entry);
                } else if self.config.verbose {
                    println!("Ignoring: {entry}");
                }
            }
        }
        Ok(entries.into_iter().unique().collect())
    }

    fn is_aborted(&self) -> bool {
        self.abort_flag.load(Ordering::SeqCst)
    }

    fn print_debug_info(&self, entries: &[Entry], ranked: &[ComparisonResult<'_>]) {
        println!("{}", format!("Entries ({}):", entries.len()).bold());
        for entry in entries {
            let tokens = tokenize(entry).into_iter().sorted().join(", ");
            println!("  {entry}: [{tokens}]");
        }
        let above = ranked
            .iter()
            .take_while(|result| result.factor >= self.config.factor)
            .count();
        println!(
            "{}",
            format!("Pairs ({} total, {above} above threshold):", ranked.len()).bold()
        );
        for result in ranked.iter().take(DEBUG_PAIR_COUNT) {
            println!("  {result}");
        }
    }
}
