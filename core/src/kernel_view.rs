//! Kernel view reader.
//!
//! Reads and parses the heterogeneous, volatile tables a Unix-like kernel
//! exposes through a process-table-like filesystem (`/proc` on Linux).
//! Every operation here is local to one process or to the system-wide lock
//! table; callers absorb `NotFound`/`PermissionDenied`/`InvalidFormat` per
//! process and keep going.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use common::Error;

pub type Pid = i32;

/// Single-character process state code, as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Sleeping,
    DiskWait,
    Stopped,
    Zombie,
    Dead,
    /// A state code the reader doesn't recognize. Kept rather than
    /// rejected, since unknown codes must not abort the pass.
    Unknown(char),
}

impl ProcessState {
    pub fn from_code(code: char) -> Self {
        match code {
            'R' => ProcessState::Running,
            'S' => ProcessState::Sleeping,
            'D' => ProcessState::DiskWait,
            'T' | 't' => ProcessState::Stopped,
            'Z' => ProcessState::Zombie,
            'X' | 'x' => ProcessState::Dead,
            other => ProcessState::Unknown(other),
        }
    }
}

/// Parsed `status` record for one process. Missing fields default to
/// empty/zero rather than failing the whole parse.
#[derive(Debug, Clone, Default)]
pub struct StatusRecord {
    pub name: String,
    pub state: Option<ProcessState>,
    pub parent: Pid,
    pub uid: u32,
    pub gid: u32,
    pub rss_kb: u64,
    pub thread_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Flock,
    Posix,
}

/// A single advisory-lock record, from either a per-process or the
/// system-wide lock table.
#[derive(Debug, Clone)]
pub struct LockRecord {
    pub seq_id: u64,
    pub kind: LockKind,
    pub owning_pid: Pid,
    pub inode: u64,
    pub range_start: u64,
    pub range_end: u64,
    pub is_write: bool,
}

/// Everything the pipeline needs from the kernel, abstracted behind a
/// trait so tests can supply fixture data instead of a real process table.
pub trait KernelView {
    fn enumerate_processes(&self) -> Result<Vec<Pid>, Error>;
    fn read_status(&mut self, pid: Pid) -> Result<StatusRecord, Error>;
    fn read_fd_list(&self, pid: Pid) -> Result<Vec<u32>, Error>;
    fn read_wait_channel(&self, pid: Pid) -> Result<String, Error>;
    fn read_locks(&self, pid: Pid) -> Result<Vec<LockRecord>, Error>;
    fn read_system_locks(&self) -> Result<Vec<LockRecord>, Error>;
    fn resolve_fd(&self, pid: Pid, fd: u32) -> Result<String, Error>;
}

struct CacheEntry {
    fetched_at: Instant,
    record: StatusRecord,
}

/// Production `KernelView` backed by a process-table-like filesystem.
///
/// Holds a small per-PID cache of the raw status payload with a
/// configurable time-to-live, so one detection pass doesn't re-parse the
/// same file if several stages need it.
pub struct ProcfsView {
    root: PathBuf,
    ttl: Duration,
    cache: RefCell<HashMap<Pid, CacheEntry>>,
}

impl ProcfsView {
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl,
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn pid_dir(&self, pid: Pid) -> PathBuf {
        self.root.join(pid.to_string())
    }

    fn map_io_err(pid: Pid, err: io::Error) -> Error {
        match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound(pid),
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(pid),
            _ => Error::Io(err),
        }
    }

    /// Evict cache entries older than `ttl`. Exposed separately from
    /// `read_status` so a pass can proactively trim the cache between
    /// stages if it wants to bound memory use.
    pub fn evict_stale(&self) {
        let now = Instant::now();
        self.cache
            .borrow_mut()
            .retain(|_, entry| now.duration_since(entry.fetched_at) < self.ttl);
    }

    fn parse_status(text: &str) -> StatusRecord {
        let mut record = StatusRecord::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "Name" => record.name = value.to_string(),
                "State" => {
                    record.state = value.chars().next().map(ProcessState::from_code);
                }
                "PPid" => record.parent = value.parse().unwrap_or(0),
                "Uid" => record.uid = first_field(value).unwrap_or(0),
                "Gid" => record.gid = first_field(value).unwrap_or(0),
                "VmRSS" => record.rss_kb = first_field(value).unwrap_or(0),
                "Threads" => record.thread_count = value.parse().unwrap_or(0),
                _ => {}
            }
        }
        record
    }

    fn parse_lock_line(line: &str) -> Option<LockRecord> {
        // `seq: kind advisory rw pid dev:inode start end`
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 8 {
            return None;
        }
        let seq_id = fields[0].trim_end_matches(':').parse().ok()?;
        let kind = match fields[1] {
            "FLOCK" => LockKind::Flock,
            "POSIX" => LockKind::Posix,
            _ => return None,
        };
        let is_write = fields[3].eq_ignore_ascii_case("write");
        let owning_pid: Pid = fields[4].parse().ok()?;
        let inode = fields[5].split_once(':').and_then(|(_, ino)| ino.parse().ok())?;
        let range_start = fields[6].parse().unwrap_or(0);
        let range_end = if fields[7] == "EOF" {
            u64::MAX
        } else {
            fields[7].parse().unwrap_or(0)
        };
        Some(LockRecord {
            seq_id,
            kind,
            owning_pid,
            inode,
            range_start,
            range_end,
            is_write,
        })
    }

    fn parse_locks(text: &str) -> Vec<LockRecord> {
        text.lines().filter_map(Self::parse_lock_line).collect()
    }
}

fn first_field(value: &str) -> Option<u64> {
    value.split_whitespace().next()?.parse().ok()
}

impl KernelView for ProcfsView {
    fn enumerate_processes(&self) -> Result<Vec<Pid>, Error> {
        let mut pids = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(Error::Io)?;
        for entry in entries {
            let entry = entry.map_err(Error::Io)?;
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(pid) = name.parse::<Pid>() {
                    if pid > 0 {
                        pids.push(pid);
                    }
                }
            }
        }
        pids.sort_unstable();
        Ok(pids)
    }

    fn read_status(&mut self, pid: Pid) -> Result<StatusRecord, Error> {
        if let Some(entry) = self.cache.borrow().get(&pid) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.record.clone());
            }
        }
        let path = self.pid_dir(pid).join("status");
        let text = fs::read_to_string(&path).map_err(|e| Self::map_io_err(pid, e))?;
        let record = Self::parse_status(&text);
        self.cache.borrow_mut().insert(
            pid,
            CacheEntry {
                fetched_at: Instant::now(),
                record: record.clone(),
            },
        );
        Ok(record)
    }

    fn read_fd_list(&self, pid: Pid) -> Result<Vec<u32>, Error> {
        let dir = self.pid_dir(pid).join("fd");
        let entries = fs::read_dir(&dir).map_err(|e| Self::map_io_err(pid, e))?;
        let mut fds = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Self::map_io_err(pid, e))?;
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(fd) = name.parse::<u32>() {
                    fds.push(fd);
                }
            }
        }
        fds.sort_unstable();
        Ok(fds)
    }

    fn read_wait_channel(&self, pid: Pid) -> Result<String, Error> {
        let path = self.pid_dir(pid).join("wchan");
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text.trim_end_matches('\n').to_string()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(Self::map_io_err(pid, e)),
        }
    }

    fn read_locks(&self, pid: Pid) -> Result<Vec<LockRecord>, Error> {
        let path = self.pid_dir(pid).join("locks");
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Self::parse_locks(&text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Self::map_io_err(pid, e)),
        }
    }

    fn read_system_locks(&self) -> Result<Vec<LockRecord>, Error> {
        let path = self.root.join("locks");
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Self::parse_locks(&text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn resolve_fd(&self, pid: Pid, fd: u32) -> Result<String, Error> {
        let path = self.pid_dir(pid).join("fd").join(fd.to_string());
        fs::read_link(&path)
            .map(|target| target.to_string_lossy().into_owned())
            .map_err(|e| Self::map_io_err(pid, e))
    }
}

/// Pipe inodes are reported as `pipe:[<inode>]` inside the fd symlink
/// target. Everything else is a non-pipe target, ignored by the pipe pass.
pub fn parse_pipe_inode(target: &str) -> Option<u64> {
    let inner = target.strip_prefix("pipe:[")?.strip_suffix(']')?;
    inner.parse().ok()
}

pub fn is_pipe_target(target: &str) -> bool {
    parse_pipe_inode(target).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_state_codes() {
        assert_eq!(ProcessState::from_code('R'), ProcessState::Running);
        assert_eq!(ProcessState::from_code('S'), ProcessState::Sleeping);
        assert_eq!(ProcessState::from_code('Z'), ProcessState::Zombie);
    }

    #[test]
    fn unknown_state_code_is_preserved_not_rejected() {
        assert_eq!(ProcessState::from_code('?'), ProcessState::Unknown('?'));
    }

    #[test]
    fn status_parser_tolerates_missing_fields() {
        let record = ProcfsView::parse_status("Name:\tbash\nState:\tS (sleeping)\n");
        assert_eq!(record.name, "bash");
        assert_eq!(record.state, Some(ProcessState::Sleeping));
        assert_eq!(record.parent, 0);
        assert_eq!(record.rss_kb, 0);
    }

    #[test]
    fn status_parser_reads_numeric_fields() {
        let text = "Name:\tworker\nState:\tR (running)\nPPid:\t42\nUid:\t1000\t1000\t1000\t1000\nGid:\t1000\t1000\t1000\t1000\nVmRSS:\t2048 kB\nThreads:\t4\n";
        let record = ProcfsView::parse_status(text);
        assert_eq!(record.name, "worker");
        assert_eq!(record.parent, 42);
        assert_eq!(record.uid, 1000);
        assert_eq!(record.rss_kb, 2048);
        assert_eq!(record.thread_count, 4);
    }

    #[test]
    fn status_parser_ignores_unknown_keys() {
        let record = ProcfsView::parse_status("Name:\tinit\nSeccomp:\t0\nCapEff:\t0\n");
        assert_eq!(record.name, "init");
    }

    #[test]
    fn lock_line_parses_whitespace_separated_fields() {
        let lock = ProcfsView::parse_lock_line("1: FLOCK ADVISORY WRITE 1234 08:01:5678 0 EOF").unwrap();
        assert_eq!(lock.seq_id, 1);
        assert_eq!(lock.kind, LockKind::Flock);
        assert!(lock.is_write);
        assert_eq!(lock.owning_pid, 1234);
        assert_eq!(lock.inode, 5678);
        assert_eq!(lock.range_end, u64::MAX);
    }

    #[test]
    fn lock_line_rejects_short_records() {
        assert!(ProcfsView::parse_lock_line("garbage").is_none());
    }

    #[test]
    fn pipe_target_parsing() {
        assert_eq!(parse_pipe_inode("pipe:[12345]"), Some(12345));
        assert_eq!(parse_pipe_inode("/dev/null"), None);
        assert!(is_pipe_target("pipe:[1]"));
        assert!(!is_pipe_target("socket:[1]"));
    }
}
