//! Benchmarks for delegate argument marshaling.
//!
//! Measures the per-invocation cost of building a tagged native argument buffer,
//! since a fresh list is constructed for every delegate call.

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use clrhost::{ArgValue, DelegateArgs};

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("delegate_args");

    group.bench_function("append_2_i32", |b| {
        b.iter(|| {
            let mut args = DelegateArgs::new();
            args.append(ArgValue::I32(black_box(2))).unwrap();
            args.append(ArgValue::I32(black_box(2))).unwrap();
            black_box(args.as_raw_parts())
        });
    });

    group.bench_function("append_16_i32", |b| {
        b.iter(|| {
            let mut args = DelegateArgs::new();
            for i in 0..16 {
                args.append(ArgValue::I32(black_box(i))).unwrap();
            }
            black_box(args.as_raw_parts())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_append);
criterion_main!(benches);
