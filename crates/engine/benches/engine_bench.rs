//! Benchmarks for the verb engines.
//!
//! Tables are built outside the timed closures, so only verb execution is
//! measured.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use verba_core::Column;
use verba_engine::{
    derive, groupby_columns, join, orderby, pivot, rollup, Compiled, DeriveOptions, Frame,
    JoinCondition, JoinOptions, JoinValues, Order, PivotOptions, Table,
};

/// Simple LCG for reproducible pseudo-random data
fn lcg(count: usize, seed: u64, modulo: u64) -> Vec<i64> {
    let mut s = seed;
    (0..count)
        .map(|_| {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((s >> 33) % modulo) as i64
        })
        .collect()
}

fn create_table(rows: usize, groups: u64) -> Table {
    Table::from_columns([
        ("k", lcg(rows, 7, groups).into_iter().collect::<Column>()),
        ("c", lcg(rows, 11, 4).into_iter().collect::<Column>()),
        ("v", lcg(rows, 13, 1000).into_iter().collect::<Column>()),
    ])
    .unwrap()
}

fn bench_rollup(c: &mut Criterion) {
    let mut group = c.benchmark_group("rollup");
    for size in [1_000, 10_000, 100_000] {
        let table = create_table(size, 100);
        let exprs = Compiled::new()
            .agg("sum", "sum", &["v"])
            .agg("mean", "mean", &["v"])
            .agg("sd", "stdev", &["v"]);
        group.bench_with_input(BenchmarkId::from_parameter(size), &table, |b, table| {
            b.iter(|| {
                let grouped = groupby_columns(table, &["k"]).unwrap();
                black_box(rollup(&grouped, &exprs).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_hash_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_join");
    for size in [1_000, 10_000] {
        let left = create_table(size, size as u64);
        let right = Table::from_columns([
            ("u", (0..size).collect::<Column>()),
            ("w", lcg(size, 17, 100).into_iter().collect::<Column>()),
        ])
        .unwrap();
        let on = JoinCondition::columns(&["k"], &["u"]).unwrap();
        let values = JoinValues::new().left("k").left("v").right("w");
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(join(&left, &right, &on, &values, &JoinOptions::left()).unwrap()))
        });
    }
    group.finish();
}

fn bench_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("window");
    for size in [1_000, 10_000] {
        let table = create_table(size, 10);
        let table = groupby_columns(&table, &["k"]).unwrap();
        let table = orderby(&table, &[("v", Order::Asc)]).unwrap();
        let exprs = Compiled::new()
            .window(
                "rolling",
                "sum",
                &["v"],
                Vec::new(),
                Some(Frame::new(Some(-5), Some(5))),
                false,
            )
            .window("rank", "rank", &[], Vec::new(), None, false);
        group.bench_with_input(BenchmarkId::from_parameter(size), &table, |b, table| {
            b.iter(|| black_box(derive(table, &exprs, &DeriveOptions::default()).unwrap()))
        });
    }
    group.finish();
}

fn bench_pivot(c: &mut Criterion) {
    let table = create_table(10_000, 50);
    let table = groupby_columns(&table, &["k"]).unwrap();
    let on = Compiled::columns(&["c"]);
    let values = Compiled::new().agg("v", "sum", &["v"]);
    c.bench_function("pivot_10000", |b| {
        b.iter(|| black_box(pivot(&table, &on, &values, &PivotOptions::default()).unwrap()))
    });
}

criterion_group!(benches, bench_rollup, bench_hash_join, bench_window, bench_pivot);
criterion_main!(benches);
