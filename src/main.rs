//! tmreplay CLI - replay, inspect, and validate recorded game logs.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// tmreplay - a deterministic game-log replay engine
#[derive(Parser, Debug)]
#[command(name = "tmreplay")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay one log to completion and print the final scores
    Replay {
        /// Log file in the normalized dialect
        #[arg(required = true)]
        log: std::path::PathBuf,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Suppress the state summary, print scores only
        #[arg(short, long)]
        quiet: bool,
    },

    /// Replay up to an item index and dump the state
    Step {
        /// Log file in the normalized dialect
        #[arg(required = true)]
        log: std::path::PathBuf,

        /// Item index to stop before
        #[arg(short, long)]
        to: usize,
    },

    /// Parse a log and report its compiled item stream without executing
    Validate {
        /// Log file to validate
        #[arg(required = true)]
        log: std::path::PathBuf,
    },

    /// Replay many logs in parallel and aggregate pass/fail results
    Batch {
        /// Log files (one game each)
        #[arg(required = true, num_args = 1..)]
        logs: Vec<std::path::PathBuf>,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Show a progress bar
        #[arg(short, long)]
        progress: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let result = match args.command {
        Commands::Replay { log, format, quiet } => cli::replay::execute(log, format, quiet),
        Commands::Step { log, to } => cli::step::execute(log, to),
        Commands::Validate { log } => cli::validate::execute(log),
        Commands::Batch {
            logs,
            threads,
            progress,
        } => cli::batch::execute(logs, threads, progress),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
