use criterion::{criterion_group, criterion_main, Criterion};
use fastrand::Rng;
use knapforge::config::CrossoverKind;
use knapforge::optimizer::{pair_parents, reproduce, ReproductionParams};
use knapforge::population::GenomeBuffer;
use knapforge::scorer::evaluate;
use std::hint::black_box;

const ROWS: usize = 2_000;
const COLS: usize = 500;

fn setup_population(rng: &mut Rng) -> GenomeBuffer {
    let mut pop = GenomeBuffer::in_memory(ROWS, COLS);
    let genes: Vec<u8> = (0..ROWS * COLS).map(|_| rng.bool() as u8).collect();
    pop.write_rows(0, &genes).unwrap();
    pop
}

fn bench_reproduction(c: &mut Criterion) {
    let mut rng = Rng::with_seed(42);
    let pop = setup_population(&mut rng);
    let selected: Vec<usize> = (0..ROWS).map(|_| rng.usize(0..ROWS)).collect();
    let pairs = pair_parents(&selected, &mut rng).unwrap();
    let mut children = GenomeBuffer::in_memory(ROWS, COLS);

    let mut group = c.benchmark_group("reproduction");
    for kind in [CrossoverKind::OnePoint, CrossoverKind::TwoPoint] {
        let params = ReproductionParams {
            crossover: kind,
            crossover_probability: 0.9,
            mutation_probability: 0.01,
            batch_size: 500,
        };
        group.bench_function(format!("{}-point", kind), |b| {
            b.iter(|| {
                reproduce(black_box(&pop), &mut children, &pairs, &params, &mut rng).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_fitness(c: &mut Criterion) {
    let mut rng = Rng::with_seed(7);
    let pop = setup_population(&mut rng);
    let values: Vec<i64> = (0..COLS).map(|_| rng.i64(1..100)).collect();
    let weights: Vec<i64> = (0..COLS).map(|_| rng.i64(1..100)).collect();

    c.bench_function("evaluate_2000x500", |b| {
        b.iter(|| evaluate(black_box(&pop), &values, &weights, 10_000, 1.0, 500).unwrap())
    });
}

criterion_group!(benches, bench_reproduction, bench_fitness);
criterion_main!(benches);
