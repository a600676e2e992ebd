//! Authority benchmarks for tactics_core.
//!
//! Run with: `cargo bench -p tactics_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tactics_core::prelude::*;
use tactics_test_utils::fixtures::{started_match, vec3, P1};

/// Move, attack, range preview and tick on a started two-player match.
pub fn authority_benchmark(c: &mut Criterion) {
    c.bench_function("request_move_clamped", |b| {
        b.iter_batched(
            started_match,
            |mut session| black_box(session.request_move(UnitId(1), P1, vec3(30, 0, 30))),
            BatchSize::SmallInput,
        );
    });

    c.bench_function("request_attack", |b| {
        b.iter_batched(
            started_match,
            |mut session| black_box(session.request_attack(UnitId(1), P1, UnitId(2), 10)),
            BatchSize::SmallInput,
        );
    });

    let session = started_match();
    c.bench_function("can_attack_preview", |b| {
        b.iter(|| black_box(session.can_attack(black_box(UnitId(1)), black_box(UnitId(6)))));
    });

    c.bench_function("full_turn_of_ticks", |b| {
        b.iter_batched(
            started_match,
            |mut session| {
                for _ in 0..session.config().turn_duration_ticks {
                    session.tick();
                }
                black_box(session.state_hash())
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, authority_benchmark);
criterion_main!(benches);
