use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use textshelf::catalog::{CatalogIndex, NewDocument, PageRequest, QueryEngine};

const DOCUMENTS: usize = 5_000;

fn populated_index(dir: &tempfile::TempDir) -> CatalogIndex {
    let index = CatalogIndex::bootstrap(dir.path().join("metadata.db")).expect("bootstrap");
    let docs: Vec<NewDocument> = (0..DOCUMENTS)
        .map(|i| NewDocument {
            title: format!("Volume {i}"),
            author: format!("Author {}", i % 97),
            filename: format!("volume-{i}.txt"),
            description: String::new(),
            tags: if i % 10 == 0 { "history,war".into() } else { "fiction".into() },
            file_size: 1024 * (i as u64 % 512),
        })
        .collect();
    index.writer().expect("writer").insert_all(&docs).expect("insert");
    index
}

fn bench_queries(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let engine = QueryEngine::new(Arc::new(populated_index(&dir)));

    c.bench_function("list_first_page", |b| {
        b.iter(|| engine.search(black_box(""), PageRequest::default()).expect("list"))
    });

    c.bench_function("list_deep_page", |b| {
        let request = PageRequest::new(Some(90), Some(50));
        b.iter(|| engine.search(black_box(""), request).expect("list"))
    });

    c.bench_function("keyword_search", |b| {
        b.iter(|| engine.search(black_box("history"), PageRequest::default()).expect("search"))
    });

    c.bench_function("stats", |b| b.iter(|| engine.stats().expect("stats")));
}

criterion_group!(benches, bench_queries);
criterion_main!(benches);
