use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::config::Config;
use crate::executor::{ActionRecord, ActionStatus};

/// Run log with buffered writes.
pub struct FileLogger {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileLogger {
    /// Create a new file logger, writing to ~/logs/dir-sort/dirsort_<timestamp>.log
    ///
    /// # Errors
    /// Returns an error if the log directory or file cannot be created.
    pub fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Failed to get home directory")?;
        let log_dir = home_dir.join("logs").join(env!("CARGO_PKG_NAME"));
        Self::in_directory(&log_dir)
    }

    /// Create a new timestamped log file in the given directory.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be created.
    pub fn in_directory(log_dir: &Path) -> Result<Self> {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }

        let log_path = log_dir.join(format!("dirsort_{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path: log_path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log the options for this run.
    pub fn log_init(&mut self, config: &Config) {
        let _ = writeln!(self.writer, "[{}] INIT", Self::timestamp());
        for root in &config.roots {
            let _ = writeln!(self.writer, "  root: \"{}\"", root.display());
        }
        let _ = writeln!(self.writer, "  factor: {:.2}", config.factor);
        let _ = writeln!(self.writer, "  directories: {}", config.directories);
        let _ = writeln!(self.writer, "  files: {}", config.files);
        if let Some(prefix) = &config.prefix {
            let _ = writeln!(self.writer, "  prefix: \"{prefix}\"");
        }
        if !config.include.is_empty() {
            let _ = writeln!(self.writer, "  include: {:?}", config.include);
        }
        if !config.exclude.is_empty() {
            let _ = writeln!(self.writer, "  exclude: {:?}", config.exclude);
        }
        let _ = writeln!(self.writer, "  auto: {}", config.auto);
        let _ = writeln!(self.writer, "  dryrun: {}", config.dryrun);
        let _ = self.writer.flush();
    }

    /// Log every action record in order.
    pub fn log_actions(&mut self, log: &[ActionRecord]) {
        for record in log {
            let _ = writeln!(self.writer, "[{}] {record}", Self::timestamp());
            if let ActionStatus::Failed(reason) = &record.status {
                let _ = writeln!(self.writer, "  {reason}");
            }
        }
        let _ = self.writer.flush();
    }

    /// Log final counts.
    pub fn log_summary(&mut self, log: &[ActionRecord], aborted: bool) {
        let failed = log
            .iter()
            .filter(|record| matches!(record.status, ActionStatus::Failed(_)))
            .count();
        let simulated = log
            .iter()
            .filter(|record| record.status == ActionStatus::Simulated)
            .count();
        let _ = writeln!(self.writer, "[{}] STATISTICS", Self::timestamp());
        let _ = writeln!(self.writer, "  Moved:     {}", log.len() - failed - simulated);
        let _ = writeln!(self.writer, "  Failed:    {failed}");
        let _ = writeln!(self.writer, "  Simulated: {simulated}");
        if aborted {
            let _ = writeln!(self.writer, "  Aborted by user");
        }
        let _ = writeln!(self.writer, "[{}] END", Self::timestamp());
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod logger_tests {
    use super::*;

    use crate::entry::Entry;

    use tempfile::tempdir;

    #[test]
    fn writes_init_actions_and_summary() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut logger = FileLogger::in_directory(&dir.path().join("logs")).expect("should create logger");
        let path = logger.path().to_path_buf();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("dirsort_"));

        let config = Config {
            prefix: Some("TV".to_string()),
            ..Config::with_roots(vec![dir.path().to_path_buf()])
        };
        let log = vec![
            ActionRecord::new(
                Entry::file("/media", "Alpha.S01E01.mkv"),
                Entry::directory("/media", "Alpha"),
                ActionStatus::Done,
            ),
            ActionRecord::new(
                Entry::file("/media", "Alpha.S01E02.mkv"),
                Entry::directory("/media", "Alpha"),
                ActionStatus::Failed("Target already exists".to_string()),
            ),
        ];
        logger.log_init(&config);
        logger.log_actions(&log);
        logger.log_summary(&log, false);
        drop(logger);

        let content = fs::read_to_string(path).expect("should read log");
        assert!(content.contains("INIT"));
        assert!(content.contains("prefix: \"TV\""));
        assert!(content.contains("OK\t/media/Alpha.S01E01.mkv --> "));
        assert!(content.contains("Fail\t/media/Alpha.S01E02.mkv --> "));
        assert!(content.contains("Target already exists"));
        assert!(content.contains("Moved:     1"));
        assert!(content.contains("Failed:    1"));
        assert!(content.trim_end().ends_with("END"));
    }
}
