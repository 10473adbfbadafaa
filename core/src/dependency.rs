//! Dependency analyzer — the hardest piece of the pipeline.
//!
//! Cross-joins the pass's snapshots to derive who holds what and who waits
//! for whom, over two independent, unordered sources: anonymous pipes and
//! advisory file locks. The output is edges fed straight into the
//! Resource Allocation Graph, plus a `waits_on_pid` hint per process kept
//! around for human-readable explanations later.

use std::collections::{BTreeMap, HashMap, HashSet};

use common::Config;
use tracing::warn;

use crate::graph::{ResourceAllocationGraph, ResourceId};
use crate::kernel_view::{LockRecord, Pid};
use crate::snapshot::ProcessSnapshot;

/// Per-process held/waiting resource sets, plus the waits-on-PID hints used
/// by explanation generation. Capacities are bounded by
/// `Config::max_waits_per_process`; overflow is silently truncated — the
/// graph still contains the bulk of the dependency, truncation is a
/// pragmatic safeguard against pathological fan-out.
#[derive(Debug, Default, Clone)]
pub struct ProcessDependencies {
    pub held: HashSet<ResourceId>,
    pub waiting: HashSet<ResourceId>,
    pub waits_on_pid: Vec<Pid>,
}

impl ProcessDependencies {
    fn push_wait_resource(&mut self, rid: ResourceId, cap: usize, pid: Pid) {
        if self.waiting.len() >= cap && !self.waiting.contains(&rid) {
            warn!(pid, cap, "truncating waiting-resource records for process");
            return;
        }
        self.waiting.insert(rid);
    }

    fn push_waits_on_pid(&mut self, waits_on: Pid, cap: usize, pid: Pid) {
        if self.waits_on_pid.len() >= cap {
            warn!(pid, cap, "truncating waits-on-pid records for process");
            return;
        }
        if !self.waits_on_pid.contains(&waits_on) {
            self.waits_on_pid.push(waits_on);
        }
    }
}

pub struct DependencyAnalysis {
    pub graph: ResourceAllocationGraph,
    pub per_process: HashMap<Pid, ProcessDependencies>,
}

pub struct DependencyAnalyzer;

impl DependencyAnalyzer {
    /// Reduce a pipe inode into the compact resource-id space. Collisions
    /// are tolerated: a collision just means two distinct pipes are
    /// identified as the same abstract resource for the rest of this pass,
    /// which does not corrupt detection, only its precision.
    pub fn pipe_resource_id(inode: u64, modulus: u64) -> ResourceId {
        inode % modulus.max(1)
    }

    /// Run both passes and build the graph. `capacity` bounds the graph's
    /// vertex arena (processes + resources).
    pub fn analyze(
        snapshots: &[ProcessSnapshot],
        system_locks: &[LockRecord],
        config: &Config,
        capacity: usize,
    ) -> Result<DependencyAnalysis, common::Error> {
        let mut graph = ResourceAllocationGraph::new(capacity);
        let mut per_process: HashMap<Pid, ProcessDependencies> = HashMap::new();

        Self::pipe_pass(snapshots, config, &mut graph, &mut per_process)?;
        Self::lock_pass(snapshots, system_locks, config, &mut graph, &mut per_process)?;

        Ok(DependencyAnalysis { graph, per_process })
    }

    fn pipe_pass(
        snapshots: &[ProcessSnapshot],
        config: &Config,
        graph: &mut ResourceAllocationGraph,
        per_process: &mut HashMap<Pid, ProcessDependencies>,
    ) -> Result<(), common::Error> {
        // Group snapshot indices by shared pipe inode, preserving
        // enumeration order within each group.
        let mut inode_to_indices: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        for (idx, snap) in snapshots.iter().enumerate() {
            for endpoint in &snap.pipe_endpoints {
                inode_to_indices.entry(endpoint.inode).or_default().push(idx);
            }
        }

        for (inode, indices) in inode_to_indices {
            let rid = Self::pipe_resource_id(inode, config.pipe_id_modulus);
            for &i in &indices {
                for &j in &indices {
                    if i == j {
                        continue;
                    }
                    let a = &snapshots[i];
                    let b = &snapshots[j];

                    // Both hold endpoints of this pipe: ground the RAG with
                    // allocation edges on both sides.
                    graph.add_allocation_edge(rid, a.pid)?;
                    graph.add_allocation_edge(rid, b.pid)?;
                    per_process.entry(a.pid).or_default().held.insert(rid);
                    per_process.entry(b.pid).or_default().held.insert(rid);

                    if a.is_blocked_on_pipe {
                        graph.add_request_edge(a.pid, rid)?;
                        let entry = per_process.entry(a.pid).or_default();
                        entry.push_wait_resource(rid, config.max_waits_per_process, a.pid);
                        entry.push_waits_on_pid(b.pid, config.max_waits_per_process, a.pid);
                    }
                }
            }
        }
        Ok(())
    }

    fn lock_pass(
        snapshots: &[ProcessSnapshot],
        system_locks: &[LockRecord],
        config: &Config,
        graph: &mut ResourceAllocationGraph,
        per_process: &mut HashMap<Pid, ProcessDependencies>,
    ) -> Result<(), common::Error> {
        for snap in snapshots {
            // Materialize this process's own held locks as allocation
            // edges regardless of whether it is itself blocked.
            for lock in &snap.held_locks {
                graph.add_allocation_edge(lock.seq_id, snap.pid)?;
                per_process.entry(snap.pid).or_default().held.insert(lock.seq_id);
            }

            if !snap.is_blocked_on_lock {
                continue;
            }

            for lock in system_locks {
                if !lock.is_write || lock.owning_pid == snap.pid {
                    continue;
                }
                graph.add_request_edge(snap.pid, lock.seq_id)?;
                let entry = per_process.entry(snap.pid).or_default();
                entry.push_wait_resource(lock.seq_id, config.max_waits_per_process, snap.pid);
                entry.push_waits_on_pid(lock.owning_pid, config.max_waits_per_process, snap.pid);
            }
        }
        Ok(())
    }
}
