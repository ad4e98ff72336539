use std::sync::Arc;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use finpulse::buffer::DEFAULT_ROW_LIMIT;
use finpulse::dashboard::Dashboard;
use finpulse::snapshot::Snapshot;
use finpulse::source::MemorySource;
use finpulse::value::Row;

const DEPARTMENTS: [&str; 7] = ["Sales", "Marketing", "Ops", "R&D", "Legal", "Support", "Finance"];

fn generate_orders(rows: usize) -> Vec<Row> {
    (0..rows)
        .map(|i| {
            let month = (i % 12) + 1;
            let day = (i % 28) + 1;
            Row::new()
                .with("order_id", i as i64)
                .with("amount", 100.0 + (i % 97) as f64)
                .with("cost", 20.0 + (i % 41) as f64)
                .with("department", DEPARTMENTS[i % DEPARTMENTS.len()])
                .with("created_at", format!("2024-{month:02}-{day:02}"))
        })
        .collect()
}

fn bench_snapshot_rebuild(c: &mut Criterion) {
    let rows = generate_orders(DEFAULT_ROW_LIMIT);
    let mut group = c.benchmark_group("snapshot");

    group.bench_function("build_full_buffer", |b| {
        b.iter(|| Snapshot::build(&rows).expect("snapshot"));
    });

    group.bench_function("live_insert_with_eviction", |b| {
        b.iter_batched(
            || {
                let source = Arc::new(
                    MemorySource::new().with_table("orders", generate_orders(DEFAULT_ROW_LIMIT)),
                );
                let mut dashboard = Dashboard::new(source, "orders");
                dashboard.refresh().expect("refresh");
                dashboard
            },
            |mut dashboard| {
                dashboard.apply_live_row(generate_orders(1).remove(0));
                dashboard
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_snapshot_rebuild);
criterion_main!(benches);
