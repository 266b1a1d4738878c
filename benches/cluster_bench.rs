use criterion::{black_box, criterion_group, criterion_main, Criterion};

use logcc::cluster::{cluster, extract_seeds, Method};
use logcc::comm::NoComm;
use logcc::gen::rmat;

fn bench_variants(c: &mut Criterion) {
    let tuples = rmat::generate(&NoComm, 10, 8);
    let mut group = c.benchmark_group("rmat_scale10_ef8");
    for method in [Method::Standard, Method::Inactive, Method::LoadBalance] {
        group.bench_function(method.as_str(), |b| {
            b.iter(|| {
                let result = cluster(&NoComm, method, black_box(tuples.clone())).unwrap();
                let seeds = extract_seeds(&NoComm, result.tuples).unwrap();
                black_box(seeds.len())
            })
        });
    }
    group.finish();
}

fn bench_key_reduction(c: &mut Criterion) {
    let tuples = rmat::generate(&NoComm, 12, 4);
    c.bench_function("key_reduce_scale12", |b| {
        b.iter(|| {
            let reduced =
                logcc::cluster::reduce_by_key(&NoComm, black_box(tuples.clone())).unwrap();
            black_box(reduced.len())
        })
    });
}

criterion_group!(benches, bench_variants, bench_key_reduction);
criterion_main!(benches);
