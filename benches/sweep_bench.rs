//! Benchmarks for the sweep engine.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use warplda::counts::CountTables;
use warplda::sparse::CsrMatrix;
use warplda::sweep::{doc_sweep, word_sweep};
use warplda::token_store::TokenStore;

const N_TOPICS: usize = 20;
const N_WORDS: usize = 2000;
const N_DOCS: usize = 500;

fn synthetic_corpus() -> CsrMatrix {
    let mut rows = Vec::with_capacity(N_DOCS);
    for d in 0..N_DOCS {
        let mut row = Vec::with_capacity(30);
        for i in 0..30 {
            let w = (d * 37 + i * 101) % N_WORDS;
            row.push((w, 1 + (i % 4) as u32));
        }
        rows.push(row);
    }
    CsrMatrix::from_rows(
        rows,
        N_WORDS,
        (0..N_DOCS).map(|d| format!("doc-{d}")).collect(),
        Some((0..N_WORDS).map(|w| format!("word-{w}")).collect()),
    )
    .unwrap()
}

fn bench_doc_sweep(c: &mut Criterion) {
    let dtm = synthetic_corpus();
    let store = TokenStore::build(&dtm, N_TOPICS, 1);
    let counts = CountTables::init_from_store(&store);

    c.bench_function("doc_sweep", |b| {
        b.iter_batched(
            || (store.clone(), counts.clone()),
            |(mut store, mut counts)| {
                doc_sweep(black_box(&mut store), black_box(&mut counts), 0.1, 0.1, 0.1 * N_WORDS as f64, 1, 0);
            },
            criterion::BatchSize::LargeInput,
        )
    });
}

fn bench_word_sweep(c: &mut Criterion) {
    let dtm = synthetic_corpus();
    let store = TokenStore::build(&dtm, N_TOPICS, 1);
    let counts = CountTables::init_from_store(&store);

    c.bench_function("word_sweep", |b| {
        b.iter_batched(
            || (store.clone(), counts.clone()),
            |(mut store, mut counts)| {
                word_sweep(
                    black_box(&mut store),
                    black_box(&mut counts),
                    0.1,
                    0.1,
                    0.1 * N_WORDS as f64,
                    true,
                    1,
                    0,
                );
            },
            criterion::BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_doc_sweep, bench_word_sweep);
criterion_main!(benches);
