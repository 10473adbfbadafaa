//! Continuous-monitoring loop driver.
//!
//! Repeats passes at a bounded interval, observing a shutdown flag set
//! from a signal handler. Per the specification's concurrency model: a
//! pass in progress always runs to completion, and the inter-pass sleep
//! wakes at one-second granularity to recheck the flag rather than
//! sleeping the full interval in one syscall.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use nix::sys::signal::{self, SigHandler, Signal};
use tracing::{error, info};

use common::Config;
use detector_core::{run_pass, KernelView};

use crate::cli::Format;
use crate::render::render;

/// The single piece of cross-pass mutable state besides the kernel-view
/// cache: written by the signal handler, read by the loop between passes
/// and during the inter-pass sleep.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_shutdown_signal(_: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Install handlers for SIGINT and SIGTERM. Safe to call more than once;
/// only the loop driver's entry point does so.
pub fn install_signal_handlers() {
    let handler = SigHandler::Handler(handle_shutdown_signal);
    // SAFETY: the handler only performs an atomic store, which is
    // async-signal-safe.
    unsafe {
        let _ = signal::signal(Signal::SIGINT, handler);
        let _ = signal::signal(Signal::SIGTERM, handler);
    }
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// Run passes until the shutdown flag is observed. Returns `Ok(())` once
/// interrupted cleanly; a pass failure is logged and the loop proceeds to
/// the next tick rather than aborting the whole process (per the
/// specification's propagation policy for continuous mode).
pub fn run(view: &mut dyn KernelView, config: &Config, interval_secs: u64, format: Format) {
    install_signal_handlers();

    while !shutdown_requested() {
        match run_pass(view, config) {
            Ok(report) => {
                info!(
                    detected = report.detected,
                    processes_scanned = report.processes_scanned,
                    "pass complete"
                );
                println!("{}", render(&report, format));
            }
            Err(err) => {
                error!(error = %err, "pass failed; continuing to next tick");
            }
        }

        sleep_in_one_second_slices(interval_secs);
    }
}

fn sleep_in_one_second_slices(total_secs: u64) {
    for _ in 0..total_secs {
        if shutdown_requested() {
            return;
        }
        thread::sleep(Duration::from_secs(1));
    }
}
