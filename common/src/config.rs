//! Pipeline configuration.
//!
//! A single value threaded explicitly through the reader, assembler and
//! analyzer, so none of them reach for a hidden global. See the "shared
//! mutable state" design note: the only two pieces of state that live
//! outside an explicit value are the kernel-view cache (owned by the
//! reader, rebuilt every pass) and the signal-observed shutdown flag
//! (owned by the CLI's loop driver).

use std::time::Duration;

/// Lower/upper bound on the continuous-monitoring interval, in seconds.
pub const MIN_INTERVAL_SECS: u64 = 1;
pub const MAX_INTERVAL_SECS: u64 = 3600;

/// Default process-table root, overridable for tests and non-standard
/// mounts.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the process-table filesystem (normally `/proc`).
    pub proc_root: std::path::PathBuf,
    /// Time-to-live for the per-process status cache within one pass.
    pub status_cache_ttl: Duration,
    /// Upper bound on waiting-PID / waiting-resource records recorded per
    /// process by the dependency analyzer. Overflow is silently truncated.
    pub max_waits_per_process: usize,
    /// Fixed modulus used to compress a pipe inode into the resource-id
    /// space. Collisions are tolerated: they just mean two distinct pipes
    /// are treated as the same abstract resource for one pass.
    pub pipe_id_modulus: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_root: std::path::PathBuf::from(DEFAULT_PROC_ROOT),
            status_cache_ttl: Duration::from_secs(5),
            max_waits_per_process: 256,
            pipe_id_modulus: 1_000_000,
        }
    }
}

impl Config {
    /// Clamp an interval value to the supported range, returning whether
    /// clamping changed it (the CLI logs a warning when it does).
    pub fn clamp_interval(secs: u64) -> (u64, bool) {
        let clamped = secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS);
        (clamped, clamped != secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_bounds() {
        let cfg = Config::default();
        assert_eq!(cfg.status_cache_ttl, Duration::from_secs(5));
        assert_eq!(cfg.pipe_id_modulus, 1_000_000);
    }

    #[test]
    fn clamp_interval_leaves_in_range_values_alone() {
        assert_eq!(Config::clamp_interval(30), (30, false));
    }

    #[test]
    fn clamp_interval_clamps_out_of_range_values() {
        assert_eq!(Config::clamp_interval(0), (MIN_INTERVAL_SECS, true));
        assert_eq!(Config::clamp_interval(999_999), (MAX_INTERVAL_SECS, true));
    }
}
