//! Deadlock classifier.
//!
//! Labels each enumerated cycle definite or potential, decides which set
//! of cycles the report carries, and drives the best-effort explanation
//! and recommendation generators.

use common::Error;

use crate::cycle::Cycle;
use crate::graph::ResourceAllocationGraph;
use crate::kernel_view::Pid;

/// Per-cycle classification. `Unclassified` is the state before
/// `classify_one` runs; the transition to `Definite`/`Potential` is a pure
/// function of the cycle and the graph, with no feedback loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Unclassified,
    Definite,
    Potential,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ReportCycle {
    pub path: Vec<usize>,
    pub start_vertex: usize,
    pub length: usize,
    pub process_ids: Vec<Pid>,
    pub resource_ids: Vec<u64>,
    pub classification: CycleClass,
}

/// Serializable mirror of `Classification` restricted to its two terminal
/// states — by the time a cycle is in a report it has always been
/// classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleClass {
    Definite,
    Potential,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DeadlockReport {
    pub detected: bool,
    pub pids: Vec<Pid>,
    pub cycles: Vec<ReportCycle>,
    pub explanations: Vec<String>,
    pub recommendations: Vec<String>,
    pub timestamp: i64,
    pub processes_scanned: usize,
    pub resources_found: usize,
}

pub struct DeadlockClassifier;

impl DeadlockClassifier {
    /// A cycle is definite iff every resource vertex on it has exactly one
    /// instance; otherwise it's potential (some instance could free up
    /// without terminating anybody on the cycle).
    fn classify_one(graph: &ResourceAllocationGraph, cycle: &Cycle) -> Classification {
        let all_single_instance = cycle.resource_ids.iter().all(|&rid| {
            graph
                .find_by_rid(rid)
                .map(|idx| graph.vertex_instances(idx) == 1)
                .unwrap_or(true)
        });
        if all_single_instance {
            Classification::Definite
        } else {
            Classification::Potential
        }
    }

    /// Classify every cycle, choose which set the report carries (definite
    /// takes priority over potential; empty input or no cycles at all
    /// means no deadlock), and assemble the final report.
    ///
    /// Allocation failure while collecting the implicated PID set is fatal
    /// for the pass (propagated as `Error::OutOfMemory`); failure while
    /// generating explanations or recommendations is recoverable and just
    /// leaves those fields empty.
    pub fn classify(
        graph: &ResourceAllocationGraph,
        cycles: Vec<Cycle>,
        processes_scanned: usize,
        resources_found: usize,
        now_unix: i64,
    ) -> Result<DeadlockReport, Error> {
        let classified: Vec<(Cycle, Classification)> = cycles
            .into_iter()
            .map(|c| {
                let class = Self::classify_one(graph, &c);
                (c, class)
            })
            .collect();

        let definite: Vec<&(Cycle, Classification)> =
            classified.iter().filter(|(_, c)| *c == Classification::Definite).collect();
        let potential: Vec<&(Cycle, Classification)> =
            classified.iter().filter(|(_, c)| *c == Classification::Potential).collect();

        let chosen: Vec<&(Cycle, Classification)> = if !definite.is_empty() {
            definite
        } else {
            potential
        };

        let pids = Self::collect_pids(&chosen)?;
        let detected = !chosen.is_empty();

        let report_cycles: Vec<ReportCycle> = chosen
            .iter()
            .map(|(cycle, class)| ReportCycle {
                path: cycle.path.clone(),
                start_vertex: cycle.start_vertex(),
                length: cycle.length(),
                process_ids: cycle.process_ids.clone(),
                resource_ids: cycle.resource_ids.clone(),
                classification: match class {
                    Classification::Definite => CycleClass::Definite,
                    _ => CycleClass::Potential,
                },
            })
            .collect();

        let explanations = Self::try_build_explanations(&report_cycles).unwrap_or_default();
        let recommendations = Self::try_build_recommendations(&pids).unwrap_or_default();

        Ok(DeadlockReport {
            detected,
            pids,
            cycles: report_cycles,
            explanations,
            recommendations,
            timestamp: now_unix,
            processes_scanned,
            resources_found,
        })
    }

    fn collect_pids(chosen: &[&(Cycle, Classification)]) -> Result<Vec<Pid>, Error> {
        let mut set = std::collections::HashSet::new();
        for (cycle, _) in chosen {
            for pid in &cycle.process_ids {
                set.insert(*pid);
            }
        }
        let mut pids = Vec::new();
        pids.try_reserve(set.len())
            .map_err(|e| Error::OutOfMemory(format!("implicated pid set: {e}")))?;
        pids.extend(set);
        pids.sort_unstable();
        Ok(pids)
    }

    /// Best-effort: one human-readable line per reported cycle. Returns
    /// `None` (rather than propagating) on allocation failure, so a caller
    /// can fall back to an empty explanation list without aborting the
    /// pass.
    fn try_build_explanations(cycles: &[ReportCycle]) -> Option<Vec<String>> {
        let mut out = Vec::new();
        out.try_reserve(cycles.len()).ok()?;
        for cycle in cycles {
            let kind = match cycle.classification {
                CycleClass::Definite => "definite",
                CycleClass::Potential => "potential",
            };
            let chain = cycle
                .process_ids
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            out.push(format!(
                "{kind} deadlock: processes {chain} hold and wait on each other over resources {:?}",
                cycle.resource_ids
            ));
        }
        Some(out)
    }

    /// Best-effort: a small fixed set of advisory strings parameterized by
    /// the implicated PIDs.
    fn try_build_recommendations(pids: &[Pid]) -> Option<Vec<String>> {
        if pids.is_empty() {
            return Some(Vec::new());
        }
        let mut out = Vec::new();
        out.try_reserve(2).ok()?;
        let pid_list = pids.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
        out.push(format!("terminate one of the following processes: {pid_list}"));
        out.push("inspect the holders of contested locks/pipes before resorting to termination".to_string());
        Some(out)
    }
}
