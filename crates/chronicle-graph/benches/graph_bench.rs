// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

use chronicle_graph::{BuildOptions, build_graph};
use chronicle_log::{ChangeKind, ChangeRecord, CommitRecord, DEV_NULL, HunkRecord, LineChange};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

/// Linear history where each commit rewrites one line of a growing file
fn linear_history(n: usize) -> Vec<CommitRecord> {
    (0..n)
        .map(|i| {
            let change = if i == 0 {
                ChangeRecord {
                    kind: ChangeKind::Add,
                    old_path: DEV_NULL.to_string(),
                    new_path: "src/lib.rs".to_string(),
                    parent_commit_id: String::new(),
                    binary: false,
                    hunks: vec![HunkRecord::new(
                        (1..=100).map(|n| LineChange::added(n, None)).collect(),
                    )],
                }
            } else {
                let line = i % 100 + 1;
                ChangeRecord {
                    kind: ChangeKind::Modify,
                    old_path: "src/lib.rs".to_string(),
                    new_path: "src/lib.rs".to_string(),
                    parent_commit_id: format!("{:040x}", i - 1),
                    binary: false,
                    hunks: vec![HunkRecord::new(vec![
                        LineChange::deleted(line, None),
                        LineChange::added(line, None),
                        LineChange::added(line + 1, None),
                    ])],
                }
            };
            CommitRecord {
                id: format!("{i:040x}"),
                parent_ids: if i == 0 { Vec::new() } else { vec![format!("{:040x}", i - 1)] },
                author_name: "Bench".to_string(),
                author_email: "bench@example.com".to_string(),
                author_date: "Thu Jan 1 10:00:00 2026 +0000".to_string(),
                committer_name: String::new(),
                committer_email: String::new(),
                committer_date: String::new(),
                message: format!("commit {i}"),
                changes: vec![change],
            }
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");

    for size in [100usize, 1_000] {
        let history = linear_history(size);
        group.bench_with_input(BenchmarkId::new("provenance", size), &history, |b, history| {
            b.iter(|| build_graph(history.clone(), BuildOptions::default()).expect("build"))
        });
        group.bench_with_input(BenchmarkId::new("structure_only", size), &history, |b, history| {
            b.iter(|| {
                build_graph(history.clone(), BuildOptions::default().with_provenance(false))
                    .expect("build")
            })
        });
    }

    group.finish();
}

fn bench_blame(c: &mut Criterion) {
    let (graph, _) = build_graph(linear_history(1_000), BuildOptions::default()).expect("build");
    let head = graph.last_commit().expect("head");

    c.bench_function("blame_head", |b| {
        b.iter(|| graph.blame(std::hint::black_box("src/lib.rs"), head).map(|l| l.len()))
    });
}

criterion_group!(benches, bench_build, bench_blame);
criterion_main!(benches);
