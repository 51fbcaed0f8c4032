use criterion::{Criterion, black_box, criterion_group, criterion_main};

use emberkv_storage::Db;

fn bench_set_get_sequential(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("set_get_sequential_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::new();
                for i in 0..10_000 {
                    let key = format!("key:{i}");
                    db.set(key.clone(), format!("value:{i}"), None);
                    black_box(db.get(&key));
                }
            });
        })
    });
}

fn bench_set_concurrent(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("set_concurrent_4_tasks_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::new();
                let mut handles = Vec::new();

                for t in 0..4 {
                    let db = db.clone();
                    handles.push(tokio::spawn(async move {
                        for i in 0..2_500 {
                            db.set(format!("key:{t}:{i}"), "value".to_string(), None);
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

fn bench_list_operations(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("lpush_lpop_1k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::new();
                for i in 0..1_000 {
                    db.lpush("list", format!("item:{i}")).unwrap();
                }
                for _ in 0..1_000 {
                    black_box(db.lpop("list"));
                }
            });
        })
    });
}

fn bench_set_with_aof(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.aof");

    c.bench_function("set_with_aof_1k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::open(&path).await;
                for i in 0..1_000 {
                    db.set(format!("key:{i}"), "value".to_string(), None);
                }
            });
            let _ = std::fs::remove_file(&path);
        })
    });
}

criterion_group!(
    benches,
    bench_set_get_sequential,
    bench_set_concurrent,
    bench_list_operations,
    bench_set_with_aof,
);
criterion_main!(benches);
