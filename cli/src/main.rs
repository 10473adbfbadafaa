//! `deadlockd` — the reference CLI front end for the deadlock detector
//! core. Parses arguments, wires up logging, runs a single pass or the
//! continuous-monitoring loop, and maps the result to the process exit
//! code contract of the specification: `0` on any completed pass
//! (deadlock or not), `1` on pass failure or invalid arguments.

mod cli;
mod loop_driver;
mod render;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Mode};
use common::Config;
use detector_core::{run_pass, ProcfsView};

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_config(args: &Cli) -> Config {
    Config {
        proc_root: args.root.clone(),
        ..Config::default()
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let config = build_config(&args);
    let mut view = ProcfsView::new(config.proc_root.clone(), config.status_cache_ttl);

    match args.mode {
        Mode::Once => run_once(&mut view, &config, args.format),
        Mode::Watch { interval } => run_watch(&mut view, &config, interval, args.format),
    }
}

fn run_once(view: &mut ProcfsView, config: &Config, format: cli::Format) -> anyhow::Result<()> {
    let report = run_pass(view, config).context("detection pass failed")?;
    println!("{}", render::render(&report, format));
    Ok(())
}

fn run_watch(view: &mut ProcfsView, config: &Config, interval: u64, format: cli::Format) -> anyhow::Result<()> {
    let (interval, clamped) = Config::clamp_interval(interval);
    if clamped {
        tracing::warn!(interval, "requested interval out of bounds, clamped");
    }
    loop_driver::run(view, config, interval, format);
    Ok(())
}
