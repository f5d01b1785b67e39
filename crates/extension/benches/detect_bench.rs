//! Detection benchmarks
//!
//! Measures the recursive walk over synthetic monorepo checkouts, with and
//! without large excluded `node_modules` trees.

use std::fs;
use std::path::Path;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tempfile::TempDir;

use snykstep_extension::{detect_language, detect_sub_projects, find_file_matches};

const EXCLUDES: &[&str] = &["node_modules", ".git", "dist"];

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "").unwrap();
}

/// `services` sub-projects, each with a handful of sources and a vendored
/// `node_modules` of `vendored` packages.
fn generate_checkout(services: usize, vendored: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "go.mod");
    for i in 0..services {
        let svc = format!("services/svc-{i}");
        touch(dir.path(), &format!("{svc}/package.json"));
        touch(dir.path(), &format!("{svc}/Dockerfile"));
        for f in 0..5 {
            touch(dir.path(), &format!("{svc}/src/file-{f}.js"));
        }
        for v in 0..vendored {
            touch(dir.path(), &format!("{svc}/node_modules/pkg-{v}/package.json"));
        }
    }
    dir
}

fn bench_detect_sub_projects(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_sub_projects");

    for services in [10usize, 50] {
        let checkout = generate_checkout(services, 20);
        group.throughput(Throughput::Elements(services as u64));
        group.bench_with_input(
            BenchmarkId::new("services", services),
            &checkout,
            |b, checkout| {
                b.iter(|| detect_sub_projects(black_box(checkout.path()), EXCLUDES).unwrap())
            },
        );
    }

    group.finish();
}

fn bench_exclusion_pruning(c: &mut Criterion) {
    let checkout = generate_checkout(10, 100);
    let no_excludes: &[&str] = &[];

    let mut group = c.benchmark_group("exclusion_pruning");
    group.bench_function("pruned", |b| {
        b.iter(|| find_file_matches(black_box(checkout.path()), &["package.json"], EXCLUDES).unwrap())
    });
    group.bench_function("unpruned", |b| {
        b.iter(|| {
            find_file_matches(black_box(checkout.path()), &["package.json"], no_excludes).unwrap()
        })
    });
    group.finish();
}

fn bench_detect_language(c: &mut Criterion) {
    let checkout = generate_checkout(10, 20);
    c.bench_function("detect_language", |b| {
        b.iter(|| detect_language(black_box(checkout.path()), EXCLUDES))
    });
}

criterion_group!(
    benches,
    bench_detect_sub_projects,
    bench_exclusion_pruning,
    bench_detect_language
);
criterion_main!(benches);
