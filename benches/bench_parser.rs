extern crate loxvm;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use loxvm::{parse, scan};

pub fn criterion_benchmark(c: &mut Criterion) {
    let input = include_str!("../demos/variables.lox");
    c.bench_function("scanner", |b| {
        b.iter(|| assert!(!scan(black_box(input)).has_errors()))
    });

    let tokens = scan(input).tokens;
    c.bench_function("parser", |b| {
        b.iter(|| assert!(parse(black_box(&tokens)).is_ok()))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(1000);
    targets = criterion_benchmark
}
criterion_main!(benches);
