use criterion::{Criterion, black_box, criterion_group, criterion_main};
use shooter_core::RangeTable;

fn bench_lookup(c: &mut Criterion) {
    let small = RangeTable::new([(5.0, 1000.0), (7.5, 1500.0), (9.5, 2000.0), (14.5, 2500.0)])
        .expect("valid table");
    let large = RangeTable::new((0..256).map(|i| (f64::from(i) * 0.1, f64::from(i) * 10.0)))
        .expect("valid table");

    c.bench_function("lookup_4_entries", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for r in [3.0, 7.5, 8.0, 12.0, 20.0] {
                acc += small.lookup(black_box(r));
            }
            acc
        });
    });

    c.bench_function("lookup_256_entries", |b| {
        b.iter(|| large.lookup(black_box(13.37)));
    });
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
