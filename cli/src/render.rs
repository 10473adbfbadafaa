//! Report renderers.
//!
//! Turns a `DeadlockReport` into one of three external representations.
//! The core never serializes its own output — per the specification, that
//! is a rendering collaborator's job, reached here through `serde_json`
//! rather than a hand-rolled writer.

use detector_core::{CycleClass, DeadlockReport};

use crate::cli::Format;

pub fn render(report: &DeadlockReport, format: Format) -> String {
    match format {
        Format::Terse => terse(report),
        Format::Text => text(report),
        Format::Json => json(report),
    }
}

fn terse(report: &DeadlockReport) -> String {
    if report.detected {
        format!("deadlock: {} cycles, pids={:?}", report.cycles.len(), report.pids)
    } else {
        format!(
            "no deadlock ({} processes, {} resources)",
            report.processes_scanned, report.resources_found
        )
    }
}

fn text(report: &DeadlockReport) -> String {
    let mut out = String::new();
    out.push_str(&terse(report));
    out.push('\n');
    if !report.detected {
        return out;
    }

    for (i, cycle) in report.cycles.iter().enumerate() {
        let kind = match cycle.classification {
            CycleClass::Definite => "definite",
            CycleClass::Potential => "potential",
        };
        out.push_str(&format!(
            "cycle {i}: {kind}, length={}, path={:?}\n  processes: {:?}\n  resources: {:?}\n",
            cycle.length, cycle.path, cycle.process_ids, cycle.resource_ids
        ));
    }
    if !report.explanations.is_empty() {
        out.push_str("explanations:\n");
        for explanation in &report.explanations {
            out.push_str(&format!("  - {explanation}\n"));
        }
    }
    if !report.recommendations.is_empty() {
        out.push_str("recommendations:\n");
        for recommendation in &report.recommendations {
            out.push_str(&format!("  - {recommendation}\n"));
        }
    }
    out
}

fn json(report: &DeadlockReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}
