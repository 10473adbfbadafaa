//! End-to-end scenarios from the specification's "Testable Properties"
//! section, exercised as black-box integration tests against the public
//! `detector_core` API rather than unit tests beside the implementation —
//! mirrors the pack's own separate integration-test crate convention.

use detector_core::*;


/// Builds a `ResourceAllocationGraph` directly from the
/// `{pid, held, waiting, instances}` scenario shorthand used throughout
/// the specification's end-to-end scenarios, bypassing the kernel view
/// entirely (those scenarios are expressed at the dependency-graph
/// level, not the raw kernel-text level).
struct ScenarioProcess {
    pid: Pid,
    held: Vec<ResourceId>,
    waiting: Vec<ResourceId>,
}

fn build_graph(procs: &[ScenarioProcess], instances: &[(ResourceId, u32)]) -> ResourceAllocationGraph {
    let mut g = ResourceAllocationGraph::new(64);
    for &(rid, n) in instances {
        g.add_resource(rid, n).unwrap();
    }
    for p in procs {
        for &rid in &p.held {
            g.add_allocation_edge(rid, p.pid).unwrap();
        }
        for &rid in &p.waiting {
            g.add_request_edge(p.pid, rid).unwrap();
        }
    }
    g
}

fn run_scenario(procs: Vec<ScenarioProcess>, instances: &[(ResourceId, u32)]) -> DeadlockReport {
    let mut g = build_graph(&procs, instances);
    let cycles = CycleDetector::detect(&mut g);
    let (_, resources_found, _) = g.statistics();
    DeadlockClassifier::classify(&g, cycles, procs.len(), resources_found, 0).unwrap()
}

#[test]
fn scenario_1_no_cycle() {
    let procs = vec![
        ScenarioProcess { pid: 1001, held: vec![1], waiting: vec![] },
        ScenarioProcess { pid: 1002, held: vec![2], waiting: vec![] },
    ];
    let report = run_scenario(procs, &[(1, 1), (2, 1)]);
    assert!(!report.detected);
    assert!(report.cycles.is_empty());
    assert!(report.pids.is_empty());
}

#[test]
fn scenario_2_minimal_two_process_deadlock() {
    let procs = vec![
        ScenarioProcess { pid: 1001, held: vec![1], waiting: vec![2] },
        ScenarioProcess { pid: 1002, held: vec![2], waiting: vec![1] },
    ];
    let report = run_scenario(procs, &[(1, 1), (2, 1)]);
    assert!(report.detected);
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].classification, CycleClass::Definite);
    let mut pids = report.cycles[0].process_ids.clone();
    pids.sort_unstable();
    assert_eq!(pids, vec![1001, 1002]);
    let mut rids = report.cycles[0].resource_ids.clone();
    rids.sort_unstable();
    assert_eq!(rids, vec![1, 2]);
    assert_eq!(report.pids, vec![1001, 1002]);
}

#[test]
fn scenario_3_three_process_ring() {
    let procs = vec![
        ScenarioProcess { pid: 1001, held: vec![1], waiting: vec![2] },
        ScenarioProcess { pid: 1002, held: vec![2], waiting: vec![3] },
        ScenarioProcess { pid: 1003, held: vec![3], waiting: vec![1] },
    ];
    let report = run_scenario(procs, &[(1, 1), (2, 1), (3, 1)]);
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].classification, CycleClass::Definite);
    assert_eq!(report.cycles[0].length, 6);
    let mut pids = report.pids.clone();
    pids.sort_unstable();
    assert_eq!(pids, vec![1001, 1002, 1003]);
}

#[test]
fn scenario_4_potential_deadlock_with_multi_instance_resource() {
    let procs = vec![
        ScenarioProcess { pid: 1001, held: vec![1], waiting: vec![2] },
        ScenarioProcess { pid: 1002, held: vec![2], waiting: vec![1] },
    ];
    let report = run_scenario(procs, &[(1, 1), (2, 2)]);
    assert!(report.detected);
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].classification, CycleClass::Potential);
    let mut pids = report.pids.clone();
    pids.sort_unstable();
    assert_eq!(pids, vec![1001, 1002]);
}

#[test]
fn scenario_5_two_disjoint_cycles() {
    let procs = vec![
        ScenarioProcess { pid: 1001, held: vec![1], waiting: vec![2] },
        ScenarioProcess { pid: 1002, held: vec![2], waiting: vec![1] },
        ScenarioProcess { pid: 2001, held: vec![3], waiting: vec![4] },
        ScenarioProcess { pid: 2002, held: vec![4], waiting: vec![3] },
    ];
    let report = run_scenario(procs, &[(1, 1), (2, 1), (3, 1), (4, 1)]);
    assert_eq!(report.cycles.len(), 2);
    assert!(report.cycles.iter().all(|c| c.classification == CycleClass::Definite));
    let mut pids = report.pids.clone();
    pids.sort_unstable();
    assert_eq!(pids, vec![1001, 1002, 2001, 2002]);
}

#[test]
fn scenario_6_linear_chain_no_cycle() {
    let procs = vec![
        ScenarioProcess { pid: 1001, held: vec![1], waiting: vec![2] },
        ScenarioProcess { pid: 1002, held: vec![2], waiting: vec![] },
    ];
    let report = run_scenario(procs, &[(1, 1), (2, 1)]);
    assert!(!report.detected);
}

#[test]
fn empty_snapshot_list_produces_empty_report() {
    let report = run_scenario(vec![], &[]);
    assert!(!report.detected);
    assert!(report.cycles.is_empty());
    assert_eq!(report.processes_scanned, 0);
}

#[test]
fn single_process_with_no_resources_has_no_cycles() {
    let procs = vec![ScenarioProcess { pid: 1001, held: vec![], waiting: vec![] }];
    let report = run_scenario(procs, &[]);
    assert!(!report.detected);
}

#[test]
fn pass_idempotence_over_a_frozen_snapshot() {
    let procs = || {
        vec![
            ScenarioProcess { pid: 1001, held: vec![1], waiting: vec![2] },
            ScenarioProcess { pid: 1002, held: vec![2], waiting: vec![1] },
        ]
    };
    let first = run_scenario(procs(), &[(1, 1), (2, 1)]);
    let second = run_scenario(procs(), &[(1, 1), (2, 1)]);
    assert_eq!(first.detected, second.detected);
    assert_eq!(first.pids, second.pids);
    assert_eq!(first.cycles.len(), second.cycles.len());
}

#[test]
fn cycle_validation_round_trip() {
    let procs = vec![
        ScenarioProcess { pid: 1001, held: vec![1], waiting: vec![2] },
        ScenarioProcess { pid: 1002, held: vec![2], waiting: vec![1] },
    ];
    let mut g = build_graph(&procs, &[(1, 1), (2, 1)]);
    let cycles = CycleDetector::detect(&mut g);
    for cycle in &cycles {
        assert!(CycleDetector::validate(&g, cycle));
    }
}

/// Exercises the snapshot/dependency layer against the
/// `KernelView` trait with a tiny fixture implementation, rather than
/// bypassing it like the scenarios above — this is the seam the
/// abstraction exists for.
struct FixtureView {
    statuses: std::collections::HashMap<Pid, StatusRecord>,
    fds: std::collections::HashMap<Pid, Vec<u32>>,
    wait_channels: std::collections::HashMap<Pid, String>,
    locks: std::collections::HashMap<Pid, Vec<LockRecord>>,
    fd_targets: std::collections::HashMap<(Pid, u32), String>,
}

impl KernelView for FixtureView {
    fn enumerate_processes(&self) -> Result<Vec<Pid>> {
        let mut pids: Vec<Pid> = self.statuses.keys().copied().collect();
        pids.sort_unstable();
        Ok(pids)
    }
    fn read_status(&mut self, pid: Pid) -> Result<StatusRecord> {
        self.statuses.get(&pid).cloned().ok_or(Error::NotFound(pid))
    }
    fn read_fd_list(&self, pid: Pid) -> Result<Vec<u32>> {
        Ok(self.fds.get(&pid).cloned().unwrap_or_default())
    }
    fn read_wait_channel(&self, pid: Pid) -> Result<String> {
        Ok(self.wait_channels.get(&pid).cloned().unwrap_or_default())
    }
    fn read_locks(&self, pid: Pid) -> Result<Vec<LockRecord>> {
        Ok(self.locks.get(&pid).cloned().unwrap_or_default())
    }
    fn read_system_locks(&self) -> Result<Vec<LockRecord>> {
        Ok(self.locks.values().flatten().cloned().collect())
    }
    fn resolve_fd(&self, pid: Pid, fd: u32) -> Result<String> {
        self.fd_targets
            .get(&(pid, fd))
            .cloned()
            .ok_or(Error::NotFound(pid))
    }
}

#[test]
fn pipe_deadlock_detected_through_the_kernel_view_seam() {
    let mut statuses = std::collections::HashMap::new();
    statuses.insert(1001, StatusRecord { name: "a".into(), ..Default::default() });
    statuses.insert(1002, StatusRecord { name: "b".into(), ..Default::default() });

    let mut fds = std::collections::HashMap::new();
    fds.insert(1001, vec![3]);
    fds.insert(1002, vec![3]);

    let mut wait_channels = std::collections::HashMap::new();
    wait_channels.insert(1001, "pipe_wait".to_string());
    wait_channels.insert(1002, "pipe_wait".to_string());

    let mut fd_targets = std::collections::HashMap::new();
    fd_targets.insert((1001, 3), "pipe:[555]".to_string());
    fd_targets.insert((1002, 3), "pipe:[555]".to_string());

    let mut view = FixtureView {
        statuses,
        fds,
        wait_channels,
        locks: std::collections::HashMap::new(),
        fd_targets,
    };

    let report = run_pass(&mut view, &Config::default()).unwrap();
    assert!(report.detected);
    assert_eq!(report.processes_scanned, 2);
    let mut pids = report.pids.clone();
    pids.sort_unstable();
    assert_eq!(pids, vec![1001, 1002]);
}

#[test]
fn a_vanished_process_is_skipped_not_fatal() {
    let mut view = FixtureView {
        statuses: std::collections::HashMap::new(),
        fds: std::collections::HashMap::new(),
        wait_channels: std::collections::HashMap::new(),
        locks: std::collections::HashMap::new(),
        fd_targets: std::collections::HashMap::new(),
    };
    let report = run_pass(&mut view, &Config::default()).unwrap();
    assert!(!report.detected);
    assert_eq!(report.processes_scanned, 0);
}
