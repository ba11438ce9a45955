//! Criterion benchmarks for monitor placement and commit staging.
//!
//! Run with:
//! ```bash
//! cargo bench --package thinkdock-core --bench layout_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use thinkdock_core::provider::{ControllerInfo, ModeInfo, OutputInfo, ResourceSnapshot};
use thinkdock_core::{
    ConfigurationManager, ConnectionState, ControllerId, MockDisplayProvider, ModeId, MonitorGraph,
    MonitorId, OutputId, Point, ScreenResources,
};

// ── Fixture builders ──────────────────────────────────────────────────────────

/// `n` connected 1920×1080 outputs, each with a dedicated idle controller.
fn snapshot_with_n_heads(n: u64) -> ResourceSnapshot {
    ResourceSnapshot {
        modes: vec![ModeInfo {
            id: ModeId(1),
            width: 1920,
            height: 1080,
            refresh: 60.0,
            interlaced: false,
            double_scan: false,
            name: String::new(),
        }],
        outputs: (0..n)
            .map(|i| OutputInfo {
                id: OutputId(i),
                name: format!("DP{i}"),
                connection: ConnectionState::Connected,
                width_mm: 531,
                height_mm: 298,
                modes: vec![ModeId(1)],
                preferred_mode: Some(ModeId(1)),
                controllers: vec![ControllerId(1000 + i)],
                controller: None,
            })
            .collect(),
        controllers: (0..n)
            .map(|i| ControllerInfo {
                id: ControllerId(1000 + i),
                position: Point::ORIGIN,
                width: 0,
                height: 0,
                mode: None,
                outputs: vec![],
                possible_outputs: vec![OutputId(i)],
            })
            .collect(),
    }
}

/// A graph of `n` monitors chained left to right.
fn build_chain(n: u64) -> (ScreenResources, MonitorGraph, Vec<MonitorId>) {
    let mut resources = ScreenResources::from_snapshot(&snapshot_with_n_heads(n))
        .expect("generated snapshot must be valid");
    let mut graph = MonitorGraph::new();
    let mut ids = Vec::new();
    for i in 0..n {
        let id = graph.add_monitor(&resources, OutputId(i)).expect("output exists");
        let controller = resources
            .request_controller_for(OutputId(i))
            .expect("output exists")
            .expect("each output has its own controller");
        graph.set_controller(id, controller, &resources).expect("supported");
        graph.set_output_mode(id, ModeId(1), &resources).expect("supported");
        if let Some(&prev) = ids.last() {
            graph.set_right_wing(prev, id).expect("distinct monitors");
        }
        ids.push(id);
    }
    (resources, graph, ids)
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

/// Benchmarks [`MonitorGraph::calculate_monitor_positions`] scaling with chain length.
fn bench_calculate_positions(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate_monitor_positions");

    for &count in &[2u64, 4, 8, 16] {
        let (resources, graph, ids) = build_chain(count);
        group.bench_with_input(BenchmarkId::new("chain", count), &ids[0], |b, &primary| {
            b.iter_batched(
                || graph.clone(),
                |mut g| g.calculate_monitor_positions(black_box(primary), &resources),
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Benchmarks [`MonitorGraph::apply_cascading_config`] on a placed chain.
fn bench_cascading_config(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_cascading_config");

    for &count in &[2u64, 8, 16] {
        let (resources, mut graph, ids) = build_chain(count);
        graph
            .calculate_monitor_positions(ids[0], &resources)
            .expect("chain is placeable");
        group.bench_with_input(BenchmarkId::new("chain", count), &ids[0], |b, &primary| {
            b.iter_batched(
                || resources.clone(),
                |mut staged| graph.apply_cascading_config(black_box(primary), &mut staged),
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Benchmarks a full commit against the in-memory provider.
fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit");
    let count = 4;
    let (resources, graph, ids) = build_chain(count);

    group.bench_function("chain_4", |b| {
        b.iter_batched(
            || {
                let mut manager = ConfigurationManager::new();
                *manager.graph_mut() = graph.clone();
                manager.set_monitor_primary(ids[0]).expect("monitor exists");
                let provider = MockDisplayProvider::new(snapshot_with_n_heads(count));
                (manager, resources.clone(), provider)
            },
            |(mut manager, mut res, mut provider)| manager.commit(&mut res, &mut provider),
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_calculate_positions, bench_cascading_config, bench_commit);
criterion_main!(benches);
