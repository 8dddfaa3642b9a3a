//! Accept or reject candidate actions.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use colored::Colorize;

use crate::entry::Entry;

/// Decides whether a candidate action is carried out.
pub trait Confirm {
    fn confirm(&mut self, source: &Entry, destination: &Entry, factor: f64) -> Result<bool>;
}

/// Accept everything at or above the threshold without asking.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm {
    threshold: f64,
}

impl AutoConfirm {
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _source: &Entry, _destination: &Entry, factor: f64) -> Result<bool> {
        Ok(factor >= self.threshold)
    }
}

/// Ask the user on the terminal.
///
/// An empty answer picks the default, which is yes at or above the threshold.
pub struct Prompt<R, W> {
    threshold: f64,
    input: R,
    output: W,
}

impl Prompt<io::StdinLock<'static>, io::Stdout> {
    #[must_use]
    pub fn stdin(threshold: f64) -> Self {
        Self::new(threshold, io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub const fn new(threshold: f64, input: R, output: W) -> Self {
        Self {
            threshold,
            input,
            output,
        }
    }
}

impl<R: BufRead, W: Write> Confirm for Prompt<R, W> {
    fn confirm(&mut self, source: &Entry, destination: &Entry, factor: f64) -> Result<bool> {
        let default = factor >= self.threshold;
        let options = if default { "Y/n" } else { "y/N" };
        loop {
            writeln!(self.output, "[{factor:.2}%] {source} --> {destination}")?;
            write!(self.output, "{}", format!("Confirm? [{options}] ").magenta())?;
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                // End of input
                return Ok(default);
            }
            match answer.trim().to_lowercase().as_str() {
                "" => return Ok(default),
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => {}
            }
        }
    }
}
