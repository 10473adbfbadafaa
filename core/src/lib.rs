//! Resource state acquisition, Resource Allocation Graph construction, and
//! cycle-based deadlock classification for an out-of-process deadlock
//! detector.
//!
//! The pipeline is a single straight-line computation per detection pass:
//! *kernel views → snapshots → dependencies → RAG → cycles →
//! classification → report*. Every stage produces an owned,
//! immutable-after-construction value consumed by the next; nothing
//! outlives the pass except the final [`classifier::DeadlockReport`].

pub mod classifier;
pub mod cycle;
pub mod dependency;
pub mod graph;
pub mod kernel_view;
pub mod snapshot;

pub use classifier::{Classification, CycleClass, DeadlockClassifier, DeadlockReport, ReportCycle};
pub use cycle::{Cycle, CycleDetector};
pub use dependency::{DependencyAnalysis, DependencyAnalyzer, ProcessDependencies};
pub use graph::{Color, EdgeKind, ResourceAllocationGraph, ResourceId, VertexKind};
pub use kernel_view::{KernelView, LockKind, LockRecord, Pid, ProcessState, ProcfsView, StatusRecord};
pub use snapshot::{PipeEndpoint, ProcessSnapshot, SnapshotAssembler};

pub use common::{Config, Error, Result};

/// Run one detection pass end to end against whatever `view` exposes, and
/// produce a `DeadlockReport`. The vertex-arena capacity is sized off the
/// number of live processes so a pass never fails on an ordinary system;
/// callers with tighter bounds can call the individual stages directly.
pub fn run_pass(view: &mut dyn KernelView, config: &Config) -> Result<DeadlockReport> {
    let snapshots = SnapshotAssembler::assemble(view);
    let processes_scanned = snapshots.len();

    let system_locks = view.read_system_locks().unwrap_or_default();

    // Two resource vertices (lock + pipe) per process is a generous upper
    // bound in practice; the analyzer still falls back to `GraphFull`
    // rather than silently dropping vertices if a pathological system
    // exceeds it.
    let capacity = processes_scanned.saturating_mul(3).max(4);
    let analysis = DependencyAnalyzer::analyze(&snapshots, &system_locks, config, capacity)?;

    let mut graph = analysis.graph;
    let (_, resources_found, _) = graph.statistics();
    let cycles = CycleDetector::detect(&mut graph);

    let now = chrono::Utc::now().timestamp();
    DeadlockClassifier::classify(&graph, cycles, processes_scanned, resources_found, now)
}
