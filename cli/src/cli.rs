//! Argument parsing for the `deadlockd` binary.
//!
//! Recognizes one-shot vs. continuous modes, an interval bounded to
//! `MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS`, and a format selector for the
//! renderer — the CLI/environment collaborator surface named in the
//! specification, with no environment variables consumed.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

// Mirrors `common::config::DEFAULT_PROC_ROOT`; kept as a literal here
// because clap's `default_value` attribute wants a string literal, not a
// `const` path.
const DEFAULT_PROC_ROOT: &str = "/proc";

#[derive(Parser)]
#[command(name = "deadlockd")]
#[command(about = "Out-of-process deadlock detector")]
pub struct Cli {
    /// Root of the process-table filesystem to read.
    #[arg(long, global = true, default_value = DEFAULT_PROC_ROOT)]
    pub root: PathBuf,

    /// Report rendering format.
    #[arg(long, value_enum, global = true, default_value = "text")]
    pub format: Format,

    /// Raise the tracing filter to debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand)]
pub enum Mode {
    /// Run a single detection pass and exit.
    Once,
    /// Run passes repeatedly until interrupted.
    Watch {
        /// Seconds between the end of one pass and the start of the next.
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Format {
    Terse,
    Text,
    Json,
}
