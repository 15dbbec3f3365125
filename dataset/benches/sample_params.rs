use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use dataset::{
    GenerationConfig, ParameterGenerator, PartCatalog, PartId, config::Bounds, driver::sample_rng,
};
use std::{collections::HashSet, hint::black_box};

fn bench_generate(c: &mut Criterion) {
    let mut cfg = GenerationConfig::new("bricks.txt", "parts", "out");
    cfg.lights.count = Bounds::new(1, 8);
    let generator = ParameterGenerator::new(&cfg).unwrap();

    c.bench_function("generate", |b| {
        let mut rng = sample_rng(42);
        b.iter(|| black_box(generator.generate(&mut rng)))
    });
}

fn bench_partition(c: &mut Criterion) {
    let candidates: Vec<PartId> = (0..20_000)
        .filter_map(|i| PartId::new(&i.to_string()))
        .collect();
    let installed: HashSet<PartId> = candidates.iter().step_by(3).cloned().collect();

    c.bench_function("partition", |b| {
        b.iter_batched(
            || candidates.clone(),
            |cands| black_box(PartCatalog::partition(cands, &installed)),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_generate, bench_partition);
criterion_main!(benches);
