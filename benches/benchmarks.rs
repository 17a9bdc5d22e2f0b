//! Performance benchmarks for Repomate.
//!
//! This module contains benchmarks for:
//! - Repository URL validation on every keystroke
//! - Branch listing cleanup and default-branch selection
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use repomate::core::{is_valid_github_url, RepositoryReference};
use repomate::workflow::{normalize, select_default, Branch};

// ============================================================================
// Mock Data Fixtures
// ============================================================================

mod fixtures {
    use super::Branch;

    /// URLs as they appear while typing, valid and invalid.
    pub fn typed_urls() -> Vec<&'static str> {
        vec![
            "h",
            "https://",
            "https://github.com",
            "https://github.com/tokio-rs",
            "https://github.com/tokio-rs/tokio",
            "https://github.com/tokio-rs/tokio/",
            "https://www.github.com/serde-rs/serde",
            "http://github.com/rust-lang/rust",
            "https://gitlab.com/gitlab-org/gitlab",
            "https://github.com/tokio-rs/tokio/tree/master",
        ]
    }

    /// A listing of `count` branches with the default near the end.
    pub fn branch_listing(count: usize, default: &str) -> Vec<Branch> {
        let mut branches: Vec<Branch> =
            (0..count).map(|i| Branch::new(format!("feature/topic-{i}"))).collect();
        // Duplicates and blanks show up in real listings.
        branches.push(Branch::new("feature/topic-0"));
        branches.push(Branch::new(""));
        branches.push(Branch::new(default));
        branches
    }
}

// ============================================================================
// URL Validation Benchmarks
// ============================================================================

fn bench_url_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("url");
    let urls = fixtures::typed_urls();

    group.throughput(Throughput::Elements(urls.len() as u64));
    group.bench_function("is_valid_github_url", |b| {
        b.iter(|| {
            for url in &urls {
                black_box(is_valid_github_url(black_box(url)));
            }
        });
    });

    group.bench_function("parse_reference", |b| {
        b.iter(|| RepositoryReference::parse(black_box("https://github.com/tokio-rs/tokio/")));
    });

    group.finish();
}

// ============================================================================
// Branch Selection Benchmarks
// ============================================================================

fn bench_branch_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("branches");

    for count in [10, 100, 1000] {
        let listing = fixtures::branch_listing(count, "main");

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("normalize", count), &listing, |b, listing| {
            b.iter(|| normalize(black_box(listing.clone())));
        });

        let normalized = normalize(listing.clone());
        group.bench_with_input(
            BenchmarkId::new("select_default", count),
            &normalized,
            |b, branches| {
                b.iter(|| select_default(black_box(branches)).map(|branch| branch.name.len()));
            },
        );

        let without_main = normalize(fixtures::branch_listing(count, "develop"));
        group.bench_with_input(
            BenchmarkId::new("select_default_fallback", count),
            &without_main,
            |b, branches| {
                b.iter(|| select_default(black_box(branches)).map(|branch| branch.name.len()));
            },
        );
    }

    group.finish();
}

// ============================================================================
// Criterion Groups and Main
// ============================================================================

criterion_group!(url_benches, bench_url_validation);

criterion_group!(branch_benches, bench_branch_selection);

criterion_main!(url_benches, branch_benches);
