use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use descent_core::*;

fn gen_tiers(c: &mut Criterion) {
    let mut group = c.benchmark_group("gen_tiers");
    for floor in 1..=MAX_FLOOR {
        let config = FloorConfig::base(floor, Layout::Wide);
        let start = (config.rows / 2, config.cols / 2);
        group.bench_with_input(BenchmarkId::new("wide", floor), &config, |b, config| {
            let mut seed = 0u64;
            b.iter(|| {
                seed = seed.wrapping_add(1);
                let board = RandomBoardGenerator::new(seed, start, StartZone::Opening)
                    .generate(config, Topology::Bounded);
                black_box(board.reveal(start))
            });
        });
    }

    let config = FloorConfig::base(MAX_FLOOR, Layout::Wide);
    group.bench_function("cautious", |b| {
        let mut seed = 0u64;
        b.iter(|| {
            seed = seed.wrapping_add(1);
            black_box(
                RandomBoardGenerator::new(seed, (0, 0), StartZone::Single)
                    .cautious(true)
                    .generate(&config, Topology::Toroidal),
            )
        });
    });
    group.finish();
}

criterion_group!(benches, gen_tiers);
criterion_main!(benches);
