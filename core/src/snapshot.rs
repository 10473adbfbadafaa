//! Snapshot assembler.
//!
//! For one detection pass, composes a `ProcessSnapshot` per live PID by
//! joining the kernel view reader's operations. Per-process errors are
//! absorbed here: a process that vanishes mid-pass is skipped and the pass
//! continues with everything it could assemble.

use std::collections::HashSet;

use tracing::debug;

use crate::kernel_view::{is_pipe_target, parse_pipe_inode, KernelView, LockRecord, Pid, ProcessState};

/// Tokens the wait channel is substring-matched against to derive the two
/// "blocked on X" booleans. Fixed vocabulary per the specification.
const PIPE_WAIT_TOKENS: &[&str] = &["pipe", "futex"];
const LOCK_WAIT_TOKENS: &[&str] = &["flock", "lock"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipeEndpoint {
    pub fd: u32,
    pub inode: u64,
}

#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    pub pid: Pid,
    pub name: String,
    pub state: Option<ProcessState>,
    pub fds: Vec<u32>,
    pub wait_channel: String,
    pub held_locks: Vec<LockRecord>,
    pub pipe_endpoints: Vec<PipeEndpoint>,
    pub is_blocked_on_pipe: bool,
    pub is_blocked_on_lock: bool,
}

impl ProcessSnapshot {
    fn derive_blocking_flags(wait_channel: &str) -> (bool, bool) {
        let lower = wait_channel.to_ascii_lowercase();
        let on_pipe = PIPE_WAIT_TOKENS.iter().any(|tok| lower.contains(tok));
        let on_lock = LOCK_WAIT_TOKENS.iter().any(|tok| lower.contains(tok));
        (on_pipe, on_lock)
    }
}

/// Assembles the ordered list of `ProcessSnapshot`s for one detection pass.
pub struct SnapshotAssembler;

impl SnapshotAssembler {
    /// Assemble snapshots for every PID the reader currently enumerates.
    /// Processes that error out (vanished, denied, malformed) are skipped;
    /// only the per-process error is logged, the pass itself never fails
    /// here.
    pub fn assemble(view: &mut dyn KernelView) -> Vec<ProcessSnapshot> {
        let pids = match view.enumerate_processes() {
            Ok(pids) => pids,
            Err(err) => {
                debug!(error = %err, "failed to enumerate processes");
                return Vec::new();
            }
        };

        let mut snapshots = Vec::with_capacity(pids.len());
        for pid in pids {
            match Self::assemble_one(view, pid) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => {
                    debug!(pid, error = %err, "skipping process for this pass");
                }
            }
        }
        snapshots
    }

    fn assemble_one(view: &mut dyn KernelView, pid: Pid) -> Result<ProcessSnapshot, common::Error> {
        let status = view.read_status(pid)?;
        let fds = view.read_fd_list(pid)?;
        let wait_channel = view.read_wait_channel(pid)?;
        let held_locks = view.read_locks(pid)?;

        let mut pipe_endpoints = Vec::new();
        let mut seen_inodes = HashSet::new();
        for fd in &fds {
            if let Ok(target) = view.resolve_fd(pid, *fd) {
                if is_pipe_target(&target) {
                    if let Some(inode) = parse_pipe_inode(&target) {
                        if seen_inodes.insert((*fd, inode)) {
                            pipe_endpoints.push(PipeEndpoint { fd: *fd, inode });
                        }
                    }
                }
            }
        }

        let (is_blocked_on_pipe, is_blocked_on_lock) =
            ProcessSnapshot::derive_blocking_flags(&wait_channel);

        Ok(ProcessSnapshot {
            pid,
            name: status.name,
            state: status.state,
            fds,
            wait_channel,
            held_locks,
            pipe_endpoints,
            is_blocked_on_pipe,
            is_blocked_on_lock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipe_token_matches_any_case() {
        let (pipe, lock) = ProcessSnapshot::derive_blocking_flags("pipe_wait");
        assert!(pipe);
        assert!(!lock);
    }

    #[test]
    fn futex_counts_as_pipe_blocking() {
        let (pipe, _) = ProcessSnapshot::derive_blocking_flags("futex_wait_queue_me");
        assert!(pipe);
    }

    #[test]
    fn flock_and_lock_tokens_count_as_lock_blocking() {
        let (_, lock1) = ProcessSnapshot::derive_blocking_flags("flock_lock");
        let (_, lock2) = ProcessSnapshot::derive_blocking_flags("posix_lock_wait");
        assert!(lock1);
        assert!(lock2);
    }

    #[test]
    fn empty_wait_channel_blocks_on_nothing() {
        let (pipe, lock) = ProcessSnapshot::derive_blocking_flags("");
        assert!(!pipe);
        assert!(!lock);
    }

    #[test]
    fn unrelated_wait_channel_blocks_on_nothing() {
        let (pipe, lock) = ProcessSnapshot::derive_blocking_flags("schedule_timeout");
        assert!(!pipe);
        assert!(!lock);
    }
}
