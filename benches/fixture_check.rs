use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sigconform::backend::builtin_catalog;
use sigconform::backend::{CheckOptions, Checker};
use sigconform::fixture::{parse_fixture, MarkerSyntax, DEFAULT_PREFIXES};

const FIXTURE: &str = include_str!("../fixtures/testing_library.fixture");

fn syntax() -> MarkerSyntax {
    MarkerSyntax::new(DEFAULT_PREFIXES).expect("valid prefixes")
}

/// Building the preset: query-family expansion plus validation
fn bench_preset_build(c: &mut Criterion) {
    c.bench_function("preset_build", |b| {
        b.iter(|| black_box(builtin_catalog::testing_library().expect("preset builds")));
    });
}

fn bench_parse(c: &mut Criterion) {
    let syntax = syntax();
    c.bench_function("parse_fixture", |b| {
        b.iter(|| black_box(parse_fixture(black_box(FIXTURE), &syntax).expect("fixture parses")));
    });
}

/// Evaluation of the whole fixture, sequential vs. parallel at several pool sizes
fn bench_check(c: &mut Criterion) {
    let fixture = parse_fixture(FIXTURE, &syntax()).expect("fixture parses");
    let mut group = c.benchmark_group("check_fixture");

    for (parallel, workers) in [(false, 1), (true, 2), (true, 4), (true, 8)] {
        let catalog = builtin_catalog::testing_library().expect("preset builds");
        let options = CheckOptions {
            parallel,
            workers,
            show_passing: false,
        };
        let checker = Checker::new(catalog, options).expect("checker starts");
        let label = if parallel { "parallel" } else { "sequential" };

        group.bench_with_input(BenchmarkId::new(label, workers), &workers, |b, _| {
            b.iter(|| black_box(checker.check("bench", &fixture)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_preset_build, bench_parse, bench_check);
criterion_main!(benches);
