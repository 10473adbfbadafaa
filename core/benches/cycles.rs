//! Empirical read on the cycle detector's stated `O((V + E) * C)` bound:
//! builds a chain of independent two-process/two-resource rings of
//! configurable size and times full enumeration over it.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use detector_core::{CycleDetector, ResourceAllocationGraph};

fn ring_graph(rings: u64) -> ResourceAllocationGraph {
    let mut graph = ResourceAllocationGraph::new((rings * 4) as usize);
    for i in 0..rings {
        let pid_a = (1000 + i * 2) as i32;
        let pid_b = (1001 + i * 2) as i32;
        let rid_a = i * 2;
        let rid_b = i * 2 + 1;
        graph.add_allocation_edge(rid_a, pid_a).unwrap();
        graph.add_request_edge(pid_a, rid_b).unwrap();
        graph.add_allocation_edge(rid_b, pid_b).unwrap();
        graph.add_request_edge(pid_b, rid_a).unwrap();
    }
    graph
}

fn bench_cycle_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("cycle_detection");
    for &rings in &[10u64, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(rings), &rings, |b, &rings| {
            b.iter_batched(
                || ring_graph(rings),
                |mut graph| {
                    let cycles = CycleDetector::detect(&mut graph);
                    black_box(cycles);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cycle_detection);
criterion_main!(benches);
