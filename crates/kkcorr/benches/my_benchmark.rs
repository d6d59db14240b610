use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kkcorr::{Catalog, KKCorrelation, KKCorrelationBuilder};
use kkcorr_test::RandomCatalog;

fn to_catalog(data: &RandomCatalog) -> Catalog {
    let [x, y, z] = data.positions.as_slice() else {
        panic!("expected 3D positions");
    };
    Catalog::from_xyz(x, y, z, &data.k, Some(data.weights.as_slice())).unwrap()
}

fn help_setup_criterion_benchmark(c: &mut Criterion, bin_slop: f64) {
    let setup_fn = || -> KKCorrelation {
        KKCorrelationBuilder::new()
            .min_sep(0.1)
            .max_sep(5.0)
            .nbins(10)
            .bin_slop(bin_slop)
            .build()
            .unwrap()
    };

    let mut group = c.benchmark_group(format!("bin_slop={bin_slop}"));
    for n_points in [1000usize, 4000, 16000] {
        let catalog = to_catalog(&RandomCatalog::from_random(
            n_points,
            3,
            10.0,
            2525365464_u64,
        ));

        group.throughput(Throughput::Elements(n_points as u64));
        group.bench_with_input(
            BenchmarkId::new("auto", n_points),
            &catalog,
            |b, catalog: &Catalog| {
                b.iter_batched_ref(
                    setup_fn,
                    |corr: &mut KKCorrelation| corr.process_auto(catalog, None),
                    BatchSize::LargeInput,
                )
            },
        );
    }
    group.finish();
}

fn criterion_benchmark(c: &mut Criterion) {
    help_setup_criterion_benchmark(c, 1.0);
    help_setup_criterion_benchmark(c, 0.0);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
