//! Decision engine benchmarks for civic_core.
//!
//! Run with: `cargo bench -p civic_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use civic_core::placement::best_position_near_residences;
use civic_core::prelude::*;
use civic_test_utils::fixtures::SnapshotBuilder;
use civic_test_utils::RecordingGateway;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A mid-game town: a grid of cabins with one foundation.
fn town() -> Snapshot {
    let mut builder = SnapshotBuilder::new()
        .turn(150)
        .open_map(20, 20)
        .outdoor_history(&[8.0, 6.5, 5.0]);
    for x in (2..18).step_by(3) {
        for y in (2..18).step_by(3) {
            builder = builder.cabin(x, y, 6);
        }
    }
    builder.cabin_foundation(1, 1, 40).build()
}

/// Runs chain and placement benchmarks for the civic_core crate.
pub fn chain_benchmark(c: &mut Criterion) {
    let snapshot = town();
    let chain = standard_chain();

    c.bench_function("standard_chain_turn", |b| {
        b.iter(|| {
            let mut gateway = RecordingGateway::new(snapshot.clone());
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            let mut ctx = TurnContext::new(&mut gateway, &mut rng);
            black_box(chain.evaluate(black_box(&snapshot), &mut ctx).ok())
        });
    });

    c.bench_function("best_position_near_residences", |b| {
        b.iter(|| black_box(best_position_near_residences(black_box(&snapshot))));
    });
}

criterion_group!(benches, chain_benchmark);
criterion_main!(benches);
