use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use stackpool::{PoolAllocator, StackAllocator};

fn benchmark_stack_allocator(c: &mut Criterion) {
    let mut group = c.benchmark_group("StackAllocator");

    for size in [64, 256, 1024, 4096].iter() {
        group.bench_with_input(BenchmarkId::new("allocate", size), size, |b, &size| {
            let mut stack = StackAllocator::new(1024 * 1024).unwrap();

            b.iter(|| {
                for _ in 0..100 {
                    let _ = stack.allocate(size, 8);
                }
                stack.rollback_all();
            });
        });
    }

    group.bench_function("marker_rollback", |b| {
        let mut stack = StackAllocator::new(1024 * 1024).unwrap();

        b.iter(|| {
            let marker = stack.get_marker();
            for _ in 0..100 {
                let _ = stack.allocate_object(0u64);
            }
            stack.rollback_to(marker).unwrap();
        });
    });

    group.bench_function("deferred_finalizers", |b| {
        let mut stack = StackAllocator::new(1024 * 1024).unwrap();

        b.iter(|| {
            let marker = stack.get_marker();
            for i in 0..100u64 {
                let _ = stack.allocate_object(i.to_string());
            }
            stack.rollback_to(marker).unwrap();
        });
    });

    group.finish();
}

fn benchmark_pool_allocator(c: &mut Criterion) {
    let mut group = c.benchmark_group("PoolAllocator");

    for capacity in [64, 256, 1024, 4096].iter() {
        group.bench_with_input(
            BenchmarkId::new("allocate_deallocate", capacity),
            capacity,
            |b, &capacity| {
                let mut pool: PoolAllocator<u64> = PoolAllocator::new(capacity).unwrap();
                let mut handles = Vec::with_capacity(capacity);

                b.iter(|| {
                    for i in 0..capacity {
                        handles.push(pool.allocate(i as u64).unwrap());
                    }
                    for handle in handles.drain(..) {
                        pool.deallocate(handle).unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_stack_allocator, benchmark_pool_allocator);
criterion_main!(benches);
