//! Criterion benchmarks for folio.
//!
//! Covers the hot paths:
//! - block store construction and lookup
//! - text analysis
//! - index search

use std::hint::black_box;
use std::io::Cursor;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use folio::analysis::analyzer::{Analyzer, StandardAnalyzer};
use folio::block_store::{BlockStore, make};
use folio::index::{IndexConfig, IndexReader, IndexWriter};

/// Generate test documents for benchmarking.
fn generate_test_documents(count: usize) -> Vec<String> {
    let words = [
        "search", "engine", "full", "text", "index", "query", "document", "field", "term",
        "route", "tag", "content", "hash", "bucket", "slot", "probe", "store", "record",
        "header", "table", "score", "ranking", "analysis", "token", "filter", "stop",
    ];

    (0..count)
        .map(|i| {
            let doc_length = 50 + (i % 100);
            (0..doc_length)
                .map(|j| words[(i * 7 + j * 13) % words.len()])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn bench_block_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_store");
    let records: Vec<(String, String)> = (0..10_000)
        .map(|i| (format!("key-{i}"), format!("value-{i}")))
        .collect();

    group.throughput(Throughput::Elements(records.len() as u64));
    group.bench_function("make_10k", |b| {
        b.iter(|| {
            let (out, summary) = make(Cursor::new(Vec::new()), black_box(&records).iter().map(|(k, v)| (k, v))).unwrap();
            black_box((out, summary))
        })
    });

    let (out, _) = make(Cursor::new(Vec::new()), records.iter().map(|(k, v)| (k, v))).unwrap();
    let mut store = BlockStore::open(Cursor::new(out.into_inner())).unwrap();

    group.throughput(Throughput::Elements(1));
    group.bench_function("find_hit", |b| {
        b.iter(|| black_box(store.find(black_box(b"key-4242")).unwrap()))
    });
    group.bench_function("find_miss", |b| {
        b.iter(|| black_box(store.find(black_box(b"missing-key")).unwrap()))
    });

    group.finish();
}

fn bench_text_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_analysis");
    let analyzer = StandardAnalyzer::new().unwrap();
    let texts = generate_test_documents(100);

    group.throughput(Throughput::Elements(texts.len() as u64));
    group.bench_function("words_100_documents", |b| {
        b.iter(|| {
            for text in &texts {
                black_box(analyzer.words(black_box(text)).unwrap());
            }
        })
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let config = IndexConfig::default();
    let texts = generate_test_documents(1000);

    group.sample_size(20);
    group.bench_function("build_1000_documents", |b| {
        b.iter(|| {
            let mut writer = IndexWriter::new(&config).unwrap();
            for (i, text) in texts.iter().enumerate() {
                writer.add_document(format!("/doc/{i}").as_bytes(), text, "").unwrap();
            }
            let mut out = Vec::new();
            black_box(writer.finalize(&mut out).unwrap())
        })
    });

    let mut writer = IndexWriter::new(&config).unwrap();
    for (i, text) in texts.iter().enumerate() {
        writer
            .add_document(format!("/doc/{i}").as_bytes(), text, &format!("Document {i}"))
            .unwrap();
    }
    let mut out = Vec::new();
    writer.finalize(&mut out).unwrap();
    let reader = IndexReader::from_bytes(out, &config).unwrap();

    group.bench_function("single_word", |b| {
        b.iter(|| black_box(reader.search(black_box("bucket"), 10).unwrap()))
    });
    group.bench_function("three_words", |b| {
        b.iter(|| black_box(reader.search(black_box("hash bucket probe"), 10).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_block_store, bench_text_analysis, bench_search);
criterion_main!(benches);
