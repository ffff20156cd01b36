use std::{hint::black_box, sync::Arc, thread};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use subpub::{Broker, BrokerConfig};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build runtime")
}

fn broker(rt: &Runtime) -> Broker<u64> {
    Broker::with_runtime(
        BrokerConfig::default().with_buffer_size(1024),
        rt.handle().clone(),
    )
    .expect("default config is valid")
}

fn bench_subscribe_unsubscribe(c: &mut Criterion) {
    let rt = runtime();
    let broker = broker(&rt);
    c.bench_function("subscribe_unsubscribe", |b| {
        b.iter(|| {
            let sub = broker.subscribe("chan", |_| {}).unwrap();
            sub.unsubscribe();
            black_box(sub);
        })
    });
}

/// Публикация без подписчиков: проверка флага, хэш и снимок пустого списка.
fn bench_publish_no_subscribers(c: &mut Criterion) {
    let rt = runtime();
    let broker = broker(&rt);
    c.bench_function("publish_0_subs", |b| {
        b.iter(|| {
            let _ = black_box(broker.publish("chan", black_box(1)));
        })
    });
}

fn bench_publish_fan_out(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("publish_fan_out");

    for subscribers in [1usize, 10, 100] {
        let broker = broker(&rt);
        let _subs: Vec<_> = (0..subscribers)
            .map(|_| {
                broker
                    .subscribe("chan", |m| {
                        black_box(m);
                    })
                    .unwrap()
            })
            .collect();

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    // при переполнении очереди publish возвращает Overflow
                    let _ = broker.publish("chan", black_box(42));
                })
            },
        );
        broker.close(None).unwrap();
    }
    group.finish();
}

/// Несколько потоков публикуют в разные subject: шарды не должны мешать
/// друг другу.
fn bench_parallel_publish_disjoint_subjects(c: &mut Criterion) {
    let rt = runtime();
    let broker = Arc::new(broker(&rt));
    let subjects: Vec<String> = (0..4).map(|i| format!("subject-{i}")).collect();
    let _subs: Vec<_> = subjects
        .iter()
        .map(|s| broker.subscribe(s, |_| {}).unwrap())
        .collect();

    c.bench_function("parallel_publish_4_subjects", |b| {
        b.iter(|| {
            thread::scope(|scope| {
                for subject in &subjects {
                    let broker = Arc::clone(&broker);
                    scope.spawn(move || {
                        for i in 0..100 {
                            let _ = broker.publish(subject, i);
                        }
                    });
                }
            });
        })
    });
}

criterion_group!(
    benches,
    bench_subscribe_unsubscribe,
    bench_publish_no_subscribers,
    bench_publish_fan_out,
    bench_parallel_publish_disjoint_subjects,
);
criterion_main!(benches);
