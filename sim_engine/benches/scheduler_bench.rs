// SPDX-License-Identifier: MIT OR Apache-2.0
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sim_engine::Scheduler;

fn bench_schedule_and_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler");

    for &n in &[1_000usize, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::new("schedule_run", n), &n, |b, &n| {
            b.iter(|| {
                let mut sim = Scheduler::new();
                for i in 0..n {
                    let delay = ((i * 7919) % 1000) as f64 * 0.001;
                    sim.schedule(delay, |_| {}).unwrap();
                }
                sim.run(black_box(1.0));
                black_box(sim.now())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_schedule_and_run);
criterion_main!(benches);
