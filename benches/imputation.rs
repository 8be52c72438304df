use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kolosal_impute::imputation::{ChainedEquationsSolver, NeighborFiller, Statistic, StatisticFiller};
use kolosal_impute::missing::profile;
use kolosal_impute::table::{Column, Table};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Correlated numeric columns with roughly `missing_rate` of cells removed
fn create_incomplete_data(n_rows: usize, n_features: usize, missing_rate: f64) -> Table {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    let base: Vec<f64> = (0..n_rows).map(|_| rng.gen::<f64>() * 10.0).collect();

    let columns = (0..n_features)
        .map(|j| {
            let values = base
                .iter()
                .map(|&b| {
                    if rng.gen::<f64>() < missing_rate {
                        None
                    } else {
                        Some(b * (j as f64 + 1.0) + rng.gen::<f64>())
                    }
                })
                .collect();
            Column::numeric(format!("feature_{}", j), values)
        })
        .collect();

    Table::new(columns).unwrap()
}

fn bench_profile(c: &mut Criterion) {
    let mut group = c.benchmark_group("profile");

    for n_rows in [1000, 10000].iter() {
        let table = create_incomplete_data(*n_rows, 10, 0.1);
        group.bench_with_input(BenchmarkId::new("profile", n_rows), &table, |b, t| {
            b.iter(|| profile(black_box(t)).unwrap())
        });
    }

    group.finish();
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("imputation");
    group.sample_size(10);

    for n_rows in [500, 2000].iter() {
        let table = create_incomplete_data(*n_rows, 8, 0.1);

        group.bench_with_input(BenchmarkId::new("mean", n_rows), &table, |b, t| {
            b.iter(|| StatisticFiller::new(Statistic::Mean).fill(black_box(t)).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("knn", n_rows), &table, |b, t| {
            b.iter(|| NeighborFiller::new(5).fill(black_box(t)).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("iterative", n_rows), &table, |b, t| {
            b.iter(|| {
                ChainedEquationsSolver::new()
                    .with_max_rounds(5)
                    .solve(black_box(t))
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_profile, bench_strategies);
criterion_main!(benches);
