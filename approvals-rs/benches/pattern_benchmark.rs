use approvals_rs::{RuleSet, Rule};
use criterion::{criterion_group, criterion_main, Criterion};

const TEST_PATHS: &[&str] = &[
    "file-a",
    "dir-a/file-a",
    "dir-a/dir-c/file-a",
    "dir-a/dir-c/file-b",
    "dir-b/file-a",
    "dir-b/dir-d/dir-e/dir-f/dir-g/file-a",
];

const TEST_PATTERNS: &[&str] = &[
    "*",
    "*-a",
    "file-*",
    "/dir-b",
    "dir-a/dir-b",
    "**/dir-*/file-*",
    "dir-*/*",
    "dir-b/dir-d/dir-e/dir-f/dir-g/file-a",
];

fn build_ruleset(patterns: &[&str]) -> RuleSet {
    let rules = patterns
        .iter()
        .enumerate()
        .map(|(idx, &pattern)| Rule {
            pattern: pattern.to_string(),
            owners: vec![],
            line: idx + 1,
        })
        .collect();

    RuleSet::new(rules)
}

fn pattern_benchmark(c: &mut Criterion) {
    c.bench_function("resolving", |b| {
        let ruleset = build_ruleset(TEST_PATTERNS);
        b.iter(|| {
            for path in TEST_PATHS {
                ruleset.resolve(path);
            }
        })
    });

    // Cold resolution includes compiling every pattern once.
    c.bench_function("building_and_resolving", |b| {
        b.iter(|| {
            let ruleset = build_ruleset(TEST_PATTERNS);
            for path in TEST_PATHS {
                ruleset.resolve(path);
            }
        })
    });
}

criterion_group!(benches, pattern_benchmark);
criterion_main!(benches);
