mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;

use dir_sort::DirSort;

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Sort files into directories based on name similarity"
)]
pub struct Args {
    /// Directories to sort, defaults to the current directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    paths: Vec<PathBuf>,

    /// Only print what would be done without moving anything
    #[arg(short, long)]
    simulate: bool,

    /// Merge similar directories
    #[arg(short, long)]
    directories: bool,

    /// Assume yes to all queries and do not prompt
    #[arg(short, long)]
    yes: bool,

    /// Similarity threshold in percent
    #[arg(short, long, name = "PERCENT")]
    factor: Option<f64>,

    /// Prefix for new directory names, implies --files
    #[arg(short, long, name = "PREFIX")]
    prefix: Option<String>,

    /// Group similar files into new directories
    #[arg(short = 'F', long)]
    files: bool,

    /// Only consider entries that match the given pattern
    #[arg(short = 'n', long, num_args = 1, action = clap::ArgAction::Append, name = "INCLUDE")]
    include: Vec<String>,

    /// Skip entries that match the given pattern
    #[arg(short = 'e', long, num_args = 1, action = clap::ArgAction::Append, name = "EXCLUDE")]
    exclude: Vec<String>,

    /// Write a log file
    #[arg(short = 'L', long)]
    log: bool,

    /// Print debug information
    #[arg(short = 'D', long)]
    debug: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        return dir_sort::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"));
    }

    let config = config::from_args(args)?;

    let abort_flag = Arc::new(AtomicBool::new(false));
    let abort_flag_handler = Arc::clone(&abort_flag);
    ctrlc::set_handler(move || {
        if abort_flag_handler.load(Ordering::SeqCst) {
            // Second Ctrl+C - force exit
            std::process::exit(130);
        }
        println!("\n{}", "Received Ctrl+C, finishing current action...".yellow().bold());
        abort_flag_handler.store(true, Ordering::SeqCst);
    })?;

    DirSort::new(config).with_abort_flag(abort_flag).run()?;
    Ok(())
}
