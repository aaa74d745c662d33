use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgcompose::{ColumnDef, Expr, JoinKind, Placeholder, Select, Statement, Table};

fn wide_table(n: usize) -> Table {
    Table::builder("t")
        .columns((0..n).map(|i| ColumnDef::integer(format!("col{i}"))))
        .build()
        .expect("valid table")
}

/// SELECT col0, ... FROM t WHERE col0 = $1 AND col1 = $2 ...
fn build_select(table: &Table, n: usize) -> Select {
    (0..n).fold(table.select(), |select, i| {
        select.and_where(
            table
                .col(&format!("col{i}"))
                .eq(i as i32)
                .expect("comparable"),
        )
    })
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/select");

    for n in [1, 5, 10, 50, 100] {
        let table = wide_table(n);
        let select = build_select(&table, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &select, |b, select| {
            b.iter(|| black_box(select.compile_with(Placeholder::Numbered)));
        });
    }

    group.finish();
}

fn bench_build_and_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/build_and_compile");

    for n in [1, 5, 10, 50, 100] {
        let table = wide_table(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let select = build_select(&table, n);
                black_box(select.compile());
            });
        });
    }

    group.finish();
}

fn bench_join_and_or_tree(c: &mut Criterion) {
    let users = Table::builder("users")
        .column(ColumnDef::serial("id").primary_key())
        .column(ColumnDef::text("name"))
        .build()
        .expect("valid table");
    let orders = Table::builder("orders")
        .column(ColumnDef::serial("id").primary_key())
        .column(ColumnDef::integer("user_id"))
        .column(ColumnDef::integer("total"))
        .build()
        .expect("valid table");

    let mut group = c.benchmark_group("compile/join_or_tree");

    for n in [1, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let tree = Expr::or_all(
                    (0..n).map(|i| orders.col("total").gt(i as i32).expect("comparable")),
                )
                .expect("non-empty");
                let select = orders
                    .select()
                    .join(
                        JoinKind::Left,
                        &users,
                        orders.col("user_id").eq(users.col("id")).expect("comparable"),
                        Some("u"),
                        [users.col("name")],
                    )
                    .expect("valid join")
                    .and_where(tree.grouped());
                black_box(select.compile());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compile,
    bench_build_and_compile,
    bench_join_and_or_tree
);
criterion_main!(benches);
