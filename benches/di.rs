use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use resolvent::*;
use std::sync::Arc;

// ===== Services =====

struct Config {
    _port: u16,
}

struct Connection {
    _config: Arc<Config>,
}

impl Injectable for Connection {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(vec![Parameter::of::<Config>()], |args| {
            Ok(Connection { _config: args.get(0)? })
        })]
    }
}

struct Repository {
    _connection: Arc<Connection>,
}

impl Injectable for Repository {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(vec![Parameter::of::<Connection>()], |args| {
            Ok(Repository { _connection: args.get(0)? })
        })]
    }
}

struct Handler {
    _repository: Arc<Repository>,
    _config: Arc<Config>,
}

impl Injectable for Handler {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(
            vec![Parameter::of::<Repository>(), Parameter::of::<Config>()],
            |args| Ok(Handler { _repository: args.get(0)?, _config: args.get(1)? }),
        )]
    }
}

fn graph() -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.add_instance(Config { _port: 8080 });
    sc.add_singleton::<Connection>();
    sc.add_scoped::<Repository>();
    sc.add_transient::<Handler>();
    sc
}

fn provider(mode: ServiceProviderMode) -> ServiceProvider {
    graph()
        .build_with_options(ProviderOptions::default().mode(mode))
        .unwrap()
}

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let mut sc = ServiceCollection::new();
    sc.add_instance(42u64);
    let sp = sc.build().unwrap();

    // Prime the call site
    let _ = sp.get::<u64>().unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = sp.get::<u64>().unwrap();
            black_box(v);
        })
    });
}

fn bench_transient_graph_by_mode(c: &mut Criterion) {
    let mut group = c.benchmark_group("transient_graph");
    for mode in ServiceProviderMode::ALL {
        let sp = provider(mode);
        let scope = sp.create_scope().unwrap();
        // Let adaptive modes compile before measuring
        for _ in 0..16 {
            let _ = scope.get::<Handler>().unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(mode), &scope, |b, scope| {
            b.iter(|| black_box(scope.get::<Handler>().unwrap()))
        });
    }
    group.finish();
}

fn bench_first_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_resolution");
    for mode in ServiceProviderMode::ALL {
        group.bench_function(BenchmarkId::from_parameter(mode), |b| {
            b.iter_batched(
                || provider(mode),
                |sp| {
                    let scope = sp.create_scope().unwrap();
                    black_box(scope.get::<Handler>().unwrap());
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_scope_churn(c: &mut Criterion) {
    let sp = provider(ServiceProviderMode::Default);
    c.bench_function("scope_create_resolve_dispose", |b| {
        b.iter(|| {
            let scope = sp.create_scope().unwrap();
            black_box(scope.get::<Repository>().unwrap());
            scope.dispose().unwrap();
        })
    });
}

// ===== Macro Benchmarks =====

fn bench_enumerable(c: &mut Criterion) {
    let mut sc = ServiceCollection::new();
    for i in 0..64u32 {
        sc.add_transient_factory(move |_| Ok(i));
    }
    let sp = sc.build().unwrap();

    c.bench_function("enumerable_64_transients", |b| {
        b.iter(|| black_box(sp.get_all::<u32>().unwrap().len()))
    });
}

criterion_group!(
    micro_benches,
    bench_singleton_hit,
    bench_transient_graph_by_mode,
    bench_first_resolution,
    bench_scope_churn
);

criterion_group!(macro_benches, bench_enumerable);

criterion_main!(micro_benches, macro_benches);
