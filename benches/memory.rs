#![allow(unused)]
extern crate nativemem;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use nativemem::prelude::*;
use std::hint::black_box;

native_record! {
    struct Sample {
        flags: Unsigned8,
        count: Signed64,
        ratio: Double,
        values: [Signed32; 8],
    }
}

/// Single value accessors on heap, buffer and direct memory
fn bench_scalar_access(c: &mut Criterion) {
    let runtime = Runtime::new(Platform::native());
    let backends = [
        ("array", runtime.allocate(4096)),
        ("buffer", runtime.wrap(ByteBuffer::allocate(4096))),
        ("direct", runtime.allocate_direct(4096).unwrap()),
    ];

    let mut group = c.benchmark_group("scalar");
    group.throughput(Throughput::Bytes(4096));
    for (name, memory) in &backends {
        group.bench_function(format!("put_get_i64/{name}"), |b| {
            b.iter(|| {
                for offset in (0..4096).step_by(8) {
                    memory.put_i64(offset, black_box(offset)).unwrap();
                    black_box(memory.get_i64(offset).unwrap());
                }
            });
        });
    }
    group.finish();
}

/// Bulk copies between backends
fn bench_transfer(c: &mut Criterion) {
    let runtime = Runtime::new(Platform::native());
    let size: i64 = 64 * 1024;
    let heap = runtime.allocate(size as usize);
    let direct = runtime.allocate_direct(size as usize).unwrap();
    let view = runtime.allocate(size as usize + 16).slice(16);

    let mut group = c.benchmark_group("transfer");
    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("heap_to_direct", |b| {
        b.iter(|| heap.transfer_to(0, black_box(&direct), 0, size).unwrap());
    });
    group.bench_function("direct_to_view", |b| {
        b.iter(|| direct.transfer_to(0, black_box(&view), 0, size).unwrap());
    });
    group.bench_function("get_i32s", |b| {
        let mut values = vec![0i32; (size / 4) as usize];
        b.iter(|| heap.get_i32s(0, black_box(&mut values)).unwrap());
    });
    group.finish();
}

/// Schema lookup and typed field access
fn bench_records(c: &mut Criterion) {
    let runtime = Runtime::new(Platform::native());
    let record = Record::<Sample>::new(&runtime).unwrap();

    let mut group = c.benchmark_group("records");
    group.bench_function("schema_lookup", |b| {
        b.iter(|| black_box(runtime.schema::<Sample>().unwrap()));
    });
    group.bench_function("field_access", |b| {
        b.iter(|| {
            record.count.set(&record, black_box(42)).unwrap();
            record.values[7].set(&record, black_box(7)).unwrap();
            let count = record.count.get(&record).unwrap();
            black_box(count + i64::from(record.values[7].get(&record).unwrap()))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_scalar_access, bench_transfer, bench_records);
criterion_main!(benches);
