//! Query benchmarks.

use arbordb_bench::populate;
use arbordb_core::{Direction, Graph, GraphQuery};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Benchmark equality lookups with and without a composite index.
fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for vertices in [100, 1_000].iter() {
        group.bench_with_input(BenchmarkId::new("scan", vertices), vertices, |b, &n| {
            let graph = Graph::open_in_memory().unwrap();
            populate(&graph, n, 100).unwrap();
            let query = GraphQuery::new().has("name", format!("person{}", n / 2));

            b.iter(|| {
                let tx = graph.new_transaction().unwrap();
                black_box(tx.query(&query).unwrap());
                tx.rollback().unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("indexed", vertices), vertices, |b, &n| {
            let graph = Graph::open_in_memory().unwrap();
            populate(&graph, n, 100).unwrap();
            graph.create_composite_index("byName", &["name"], false).unwrap();
            let query = GraphQuery::new().has("name", format!("person{}", n / 2));

            b.iter(|| {
                let tx = graph.new_transaction().unwrap();
                black_box(tx.query(&query).unwrap());
                tx.rollback().unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark edge traversal from a loaded vertex.
fn bench_traversal(c: &mut Criterion) {
    let graph = Graph::open_in_memory().unwrap();
    let ids = populate(&graph, 1_000, 100).unwrap();

    c.bench_function("traverse_knows", |b| {
        b.iter(|| {
            let tx = graph.new_transaction().unwrap();
            let mut current = tx.get_vertex(ids[99].as_u64()).unwrap();
            let mut hops = 0;
            while let Some(vertex) = current {
                current = tx
                    .edges(&vertex, Direction::Out, Some("knows"))
                    .unwrap()
                    .first()
                    .map(|edge| edge.in_vertex().clone());
                hops += 1;
            }
            black_box(hops);
            tx.rollback().unwrap();
        });
    });
}

criterion_group!(benches, bench_lookup, bench_traversal);
criterion_main!(benches);
