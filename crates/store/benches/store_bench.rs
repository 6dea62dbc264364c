use criterion::{Criterion, black_box, criterion_group, criterion_main};

use galecache_store::{MemoryStore, StoreClient};

fn bench_append_sequential(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("append_sequential_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = MemoryStore::new();
                store.create_record("rec", 60).await.unwrap();
                for i in 0..10_000 {
                    store.append("rec", &format!("msg:{i}")).await.unwrap();
                }
            });
        })
    });
}

fn bench_append_concurrent(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("append_concurrent_4_tasks_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = MemoryStore::new();
                store.create_record("rec", 60).await.unwrap();
                let mut handles = Vec::new();

                for t in 0..4 {
                    let store = store.clone();
                    handles.push(tokio::spawn(async move {
                        for i in 0..2_500 {
                            store.append("rec", &format!("{t}:{i}")).await.unwrap();
                        }
                    }));
                }

                for h in handles {
                    h.await.unwrap();
                }
            });
        })
    });
}

fn bench_read_record_1k(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let store = MemoryStore::new();
    rt.block_on(async {
        store.create_record("rec", 600).await.unwrap();
        for i in 0..1_000 {
            store.append("rec", &format!("msg:{i}")).await.unwrap();
        }
    });

    c.bench_function("read_record_1k", |b| {
        b.iter(|| {
            rt.block_on(async { black_box(store.read_record("rec").await.unwrap()) });
        })
    });
}

criterion_group!(
    benches,
    bench_append_sequential,
    bench_append_concurrent,
    bench_read_record_1k,
);
criterion_main!(benches);
