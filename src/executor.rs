//! Apply or simulate planned actions and keep a log of the outcomes.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use colored::Colorize;

use crate::confirm::Confirm;
use crate::entry::Entry;
use crate::fs_ops::FileSystem;
use crate::planner::PlannedAction;
use crate::{print_bold, print_error, print_warning};

/// Outcome of one logged action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Done,
    /// Simulation mode, nothing was changed.
    Simulated,
    Failed(String),
}

/// One line of the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub source: Entry,
    pub destination: Entry,
    pub status: ActionStatus,
}

/// Runs actions one at a time through the filesystem collaborator.
pub struct ActionExecutor<F, C> {
    file_system: F,
    confirm: C,
    simulate: bool,
    log: Vec<ActionRecord>,
    abort_flag: Option<Arc<AtomicBool>>,
}

impl ActionStatus {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self, Self::Done)
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Done => "OK",
            Self::Simulated => "Dryrun",
            Self::Failed(_) => "Fail",
        }
    }
}

impl From<Result<()>> for ActionStatus {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::Done,
            Err(error) => Self::Failed(format!("{error:#}")),
        }
    }
}

impl ActionRecord {
    #[must_use]
    pub const fn new(source: Entry, destination: Entry, status: ActionStatus) -> Self {
        Self {
            source,
            destination,
            status,
        }
    }

    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.status.succeeded()
    }
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{} --> {}", self.status.label(), self.source, self.destination)
    }
}

impl<F: FileSystem, C: Confirm> ActionExecutor<F, C> {
    pub const fn new(file_system: F, confirm: C, simulate: bool) -> Self {
        Self {
            file_system,
            confirm,
            simulate,
            log: Vec::new(),
            abort_flag: None,
        }
    }

    /// Stop starting new actions once the flag is set.
    #[must_use]
    pub fn with_abort_flag(mut self, abort_flag: Arc<AtomicBool>) -> Self {
        self.abort_flag = Some(abort_flag);
        self
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.abort_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    pub const fn file_system(&self) -> &F {
        &self.file_system
    }

    #[must_use]
    pub fn log(&self) -> &[ActionRecord] {
        &self.log
    }

    #[must_use]
    pub fn into_log(self) -> Vec<ActionRecord> {
        self.log
    }

    /// Confirm and run an action.
    ///
    /// Returns the entries that were committed as sources.
    /// Rejected moves are not logged and not returned.
    /// Filesystem failures are logged and do not stop the run.
    ///
    /// # Errors
    /// Returns an error if asking for confirmation fails.
    pub fn execute(&mut self, action: &PlannedAction, factor: f64) -> Result<Vec<Entry>> {
        match action {
            PlannedAction::MoveFile { source, destination } => {
                Ok(self.move_file(source, destination, factor)?.into_iter().collect())
            }
            PlannedAction::MergeDirectories { source, destination } => {
                if !self.confirm.confirm(source, destination, factor)? {
                    return Ok(Vec::new());
                }
                let status = if self.simulate {
                    ActionStatus::Simulated
                } else {
                    self.merge_contents(source, destination).into()
                };
                self.record(source, destination, status);
                Ok(vec![source.clone()])
            }
            PlannedAction::CreateDirectoryAndMove { directory, files } => {
                if !self.simulate
                    && let Err(error) = self.file_system.create_dir(&directory.full_path())
                {
                    print_warning!("{error:#}");
                }
                let mut committed = Vec::new();
                for file in files {
                    if self.is_aborted() {
                        break;
                    }
                    committed.extend(self.move_file(file, directory, factor)?);
                }
                Ok(committed)
            }
        }
    }

    fn move_file(&mut self, source: &Entry, destination: &Entry, factor: f64) -> Result<Option<Entry>> {
        if !self.confirm.confirm(source, destination, factor)? {
            return Ok(None);
        }
        let status = if self.simulate {
            ActionStatus::Simulated
        } else {
            self.file_system
                .move_into(&source.full_path(), &destination.full_path())
                .into()
        };
        self.record(source, destination, status);
        Ok(Some(source.clone()))
    }

    /// Move everything from the source directory into the destination and remove the source.
    /// Stops at the first failing move.
    fn merge_contents(&mut self, source: &Entry, destination: &Entry) -> Result<()> {
        let source_path = source.full_path();
        let destination_path = destination.full_path();
        for child in self.file_system.list_entries(&source_path)? {
            self.file_system.move_into(&child.full_path(), &destination_path)?;
        }
        self.file_system.remove_if_empty(&source_path)
    }

    fn record(&mut self, source: &Entry, destination: &Entry, status: ActionStatus) {
        if let ActionStatus::Failed(reason) = &status {
            print_error!("{reason}");
        }
        self.log
            .push(ActionRecord::new(source.clone(), destination.clone(), status));
    }
}

/// Print one line per logged action and a summary.
pub fn print_report(log: &[ActionRecord]) {
    if log.is_empty() {
        println!("Nothing to do");
        return;
    }
    print_bold!("Actions:");
    for record in log {
        let line = record.to_string();
        match record.status {
            ActionStatus::Done => println!("{}", line.green()),
            ActionStatus::Simulated => println!("{}", line.yellow()),
            ActionStatus::Failed(_) => println!("{}", line.red()),
        }
    }
    let succeeded = log.iter().filter(|record| record.succeeded()).count();
    let failed = log
        .iter()
        .filter(|record| matches!(record.status, ActionStatus::Failed(_)))
        .count();
    let simulated = log.len() - succeeded - failed;
    if simulated > 0 {
        println!("Dryrun: would have moved {simulated} item(s)");
    } else {
        println!("Moved {succeeded} item(s), {failed} failed");
    }
}
