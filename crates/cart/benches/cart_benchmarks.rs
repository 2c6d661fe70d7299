use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use gomarket_cart::{Cart, CatalogItem, LineItem};
use gomarket_core::ProductId;

fn catalog_item(id: &str) -> CatalogItem {
    CatalogItem::new(
        id,
        format!("Product {id}"),
        format!("https://img.example/{id}.png"),
        1500,
    )
    .unwrap()
}

fn cart_of(size: usize) -> Cart {
    let mut cart = Cart::new();
    for i in 0..size {
        cart.add(catalog_item(&format!("p{i}")));
    }
    cart
}

fn bench_mutation_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("cart_mutations");
    group.sample_size(1000);

    for size in [1usize, 10, 100] {
        let base = cart_of(size);
        let hot = ProductId::new(format!("p{}", size - 1)).unwrap();

        group.bench_with_input(
            BenchmarkId::new("increment_last_entry", size),
            &size,
            |b, _| {
                b.iter(|| {
                    let mut cart = base.clone();
                    black_box(cart.increment(black_box(&hot)))
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("add_new_entry", size), &size, |b, _| {
            b.iter(|| {
                let mut cart = base.clone();
                black_box(cart.add(black_box(catalog_item("fresh"))))
            });
        });
    }

    group.finish();
}

fn bench_snapshot_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_serialization");

    for size in [1usize, 10, 100] {
        let cart = cart_of(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("to_json", size), &size, |b, _| {
            b.iter(|| serde_json::to_string(black_box(cart.items())).unwrap());
        });
    }

    group.finish();
}

fn bench_hydration(c: &mut Criterion) {
    let mut group = c.benchmark_group("hydration");

    for size in [1usize, 10, 100] {
        let payload = serde_json::to_string(cart_of(size).items()).unwrap();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("from_json", size), &size, |b, _| {
            b.iter(|| {
                let items: Vec<LineItem> = serde_json::from_str(black_box(&payload)).unwrap();
                black_box(Cart::hydrate(items))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_mutation_latency,
    bench_snapshot_serialization,
    bench_hydration
);
criterion_main!(benches);
