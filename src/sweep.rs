//! The sweep engine. One full pass over all tokens, grouped either by
//! document (doc sweep) or by word (word sweep).
//!
//! Within a sweep, the *active* side's counts (`n_dk` for the doc sweep,
//! `n_wk`/`n_k` for the word sweep) update live, token by token, while the
//! *other* side is treated as a frozen, stale snapshot from the start of
//! the sweep. That staleness is what makes a sweep safe to parallelize
//! across its active-side rows.

use crate::counts::CountTables;
use crate::linalg::{Matrix, Vector};
use crate::proposal::{mh_accept, sample_doc_proposal};
use crate::rand_utils::{choose_from, seeded_rng};
use crate::token_store::TokenStore;
use rand::Rng;

/// Below this many active-side rows, sweeping in parallel isn't worth the
/// thread-pool overhead.
const PARALLEL_ROW_THRESHOLD: usize = 256;

/// One document's worth of doc-sweep work: resample every token of `d`
/// against the live local `row` (a working copy of `n_dk[d]`) and the
/// frozen `n_wk`/`n_k` snapshot. Returns the `(token_id, new_topic)`
/// pairs for tokens whose topic changed.
fn sweep_document(
    store: &TokenStore,
    n_wk: &Matrix<f64>,
    n_k: &Vector<f64>,
    alpha: f64,
    beta: f64,
    v_beta: f64,
    n_topics: usize,
    d: usize,
    row: &mut [f64],
    rng: &mut impl Rng,
) -> Vec<(usize, usize)> {
    let mut changes = Vec::new();
    for t in store.doc_token_range(d) {
        let w = store.token(t).w as usize;
        let s = store.get_z(t);
        let k_prime = sample_doc_proposal(rng, store, alpha, n_topics, d);

        let new_topic = if s == k_prime {
            s
        } else {
            let target = |k: usize| (row[k] + alpha) * ((n_wk[[w, k]] + beta) / (n_k[k] + v_beta));
            let q = |k: usize| row[k] + alpha;
            if mh_accept(rng, s, k_prime, target, q) {
                k_prime
            } else {
                s
            }
        };

        if new_topic != s {
            row[s] -= 1.0;
            row[new_topic] += 1.0;
            changes.push((t, new_topic));
        }
    }
    changes
}

/// Draw the word proposal against a local `n_wk` row and a frozen `n_k`.
fn sample_word_proposal_row<R: Rng + ?Sized>(
    rng: &mut R,
    row: &[f64],
    n_k: &Vector<f64>,
    beta: f64,
    v_beta: f64,
    n_topics: usize,
) -> usize {
    let weights: Vec<f64> = (0..n_topics).map(|k| (row[k] + beta) / (n_k[k] + v_beta)).collect();
    choose_from(rng, &weights)
}

/// One word's worth of word-sweep work: resample every token of `w`
/// against the live local `row` (a working copy of `n_wk[w]`) and the
/// frozen `n_dk`/`n_k` snapshot. Accumulates this word's contribution to
/// the change in `n_k` into `delta_k` rather than mutating a shared
/// `n_k` directly, since `n_k` is not partitioned by word the way
/// `n_wk`'s rows are.
///
/// A token's canonical topic (`z_new`) can already differ from the topic
/// `row`/`n_k` still count it under (`z_old`), when an intervening doc
/// sweep moved it. In fit mode, this sweep first reconciles that gap —
/// folding the move `z_old -> z_new` into `row`/`delta_k` — before
/// drawing and accepting/rejecting a further proposal, so the word-side
/// tables never lose track of a doc-sweep move. In inference mode
/// (`update_topics == false`) there is nothing to reconcile, since
/// `z_old` is never advanced.
///
/// Returns the `(token_id, new_topic)` pairs for tokens whose canonical
/// topic should change; the caller commits or merely advances each pair
/// depending on `update_topics`.
#[allow(clippy::too_many_arguments)]
fn sweep_word(
    store: &TokenStore,
    n_dk: &Matrix<f64>,
    n_k: &Vector<f64>,
    alpha: f64,
    beta: f64,
    v_beta: f64,
    n_topics: usize,
    w: usize,
    row: &mut [f64],
    delta_k: &mut [f64],
    update_topics: bool,
    rng: &mut impl Rng,
) -> Vec<(usize, usize)> {
    let mut changes = Vec::new();
    for &t in store.word_token_indices(w) {
        let tok = store.token(t);
        let d = tok.d as usize;
        let counted = tok.z_old as usize;
        let s = tok.z_new as usize;

        if update_topics && counted != s {
            row[counted] -= 1.0;
            row[s] += 1.0;
            delta_k[counted] -= 1.0;
            delta_k[s] += 1.0;
        }

        let k_prime = sample_word_proposal_row(rng, row, n_k, beta, v_beta, n_topics);

        let new_topic = if s == k_prime {
            s
        } else {
            let target = |k: usize| (n_dk[[d, k]] + alpha) * ((row[k] + beta) / (n_k[k] + v_beta));
            let q = |k: usize| (row[k] + beta) / (n_k[k] + v_beta);
            if mh_accept(rng, s, k_prime, target, q) {
                k_prime
            } else {
                s
            }
        };

        if update_topics {
            if new_topic != s {
                row[s] -= 1.0;
                row[new_topic] += 1.0;
                delta_k[s] -= 1.0;
                delta_k[new_topic] += 1.0;
            }
            if new_topic != counted {
                changes.push((t, new_topic));
            }
        } else if new_topic != s {
            changes.push((t, new_topic));
        }
    }
    changes
}

/// Sequential doc sweep. Always updates `n_dk`; `n_wk`/`n_k`
/// are read-only throughout.
pub fn doc_sweep(
    store: &mut TokenStore,
    counts: &mut CountTables,
    alpha: f64,
    beta: f64,
    v_beta: f64,
    seed: u64,
    iteration: u64,
) {
    let n_topics = store.n_topics();
    for d in 0..store.n_docs() {
        let mut rng = seeded_rng(seed, iteration.wrapping_mul(1_000_003).wrapping_add(d as u64));
        let mut row = counts.n_dk_row(d).to_vec();
        let changes = {
            let n_wk = counts.n_wk_matrix();
            let n_k = counts.n_k_vec();
            sweep_document(store, n_wk, n_k, alpha, beta, v_beta, n_topics, d, &mut row, &mut rng)
        };
        counts.set_n_dk_row(d, &row);
        for (t, topic) in changes {
            store.advance(t, topic);
        }
    }
}

/// Doc sweep, parallelized across documents with `rayon`:
/// each document owns its own `n_dk` row and reads only the frozen
/// `n_wk`/`n_k` snapshot, so documents can be processed fully
/// independently; results are applied back sequentially.
pub fn doc_sweep_parallel(
    store: &mut TokenStore,
    counts: &mut CountTables,
    alpha: f64,
    beta: f64,
    v_beta: f64,
    seed: u64,
    iteration: u64,
) {
    use rayon::prelude::*;

    let n_docs = store.n_docs();
    if n_docs < PARALLEL_ROW_THRESHOLD {
        doc_sweep(store, counts, alpha, beta, v_beta, seed, iteration);
        return;
    }
    let n_topics = store.n_topics();
    let store_ref: &TokenStore = store;
    let n_wk: &Matrix<f64> = counts.n_wk_matrix();
    let n_k: &Vector<f64> = counts.n_k_vec();

    let results: Vec<(Vec<f64>, Vec<(usize, usize)>)> = (0..n_docs)
        .into_par_iter()
        .map(|d| {
            let mut rng = seeded_rng(seed, iteration.wrapping_mul(1_000_003).wrapping_add(d as u64));
            let mut row = counts.n_dk_row(d).to_vec();
            let changes = sweep_document(store_ref, n_wk, n_k, alpha, beta, v_beta, n_topics, d, &mut row, &mut rng);
            (row, changes)
        })
        .collect();

    for (d, (row, changes)) in results.into_iter().enumerate() {
        counts.set_n_dk_row(d, &row);
        for (t, topic) in changes {
            store.advance(t, topic);
        }
    }
}

/// Sequential word sweep. When `update_topics` is `true`
/// (fit mode), updates `n_wk`/`n_k`; when `false` (inference mode), the
/// word sweep still runs to keep the MH chain valid, but `n_wk`/`n_k`
/// stay frozen throughout.
pub fn word_sweep(
    store: &mut TokenStore,
    counts: &mut CountTables,
    alpha: f64,
    beta: f64,
    v_beta: f64,
    update_topics: bool,
    seed: u64,
    iteration: u64,
) {
    let n_topics = store.n_topics();
    let mut total_delta_k = vec![0.0; n_topics];
    for w in 0..store.n_words() {
        let mut rng = seeded_rng(
            seed,
            iteration
                .wrapping_mul(1_000_003)
                .wrapping_add(store.n_docs() as u64)
                .wrapping_add(w as u64),
        );
        let mut row = counts.n_wk_row(w).to_vec();
        let mut delta_k = vec![0.0; n_topics];
        let changes = {
            let n_dk = counts.n_dk_matrix();
            let n_k = counts.n_k_vec();
            sweep_word(
                store, n_dk, n_k, alpha, beta, v_beta, n_topics, w, &mut row, &mut delta_k, update_topics, &mut rng,
            )
        };
        if update_topics {
            counts.set_n_wk_row(w, &row);
            for k in 0..n_topics {
                total_delta_k[k] += delta_k[k];
            }
        }
        for (t, topic) in changes {
            if update_topics {
                store.commit(t, topic);
            } else {
                store.advance(t, topic);
            }
        }
    }
    if update_topics {
        counts.add_to_n_k(&total_delta_k);
    }
}

/// Word sweep, parallelized across words with `rayon`: each word owns its
/// own `n_wk` row and reads only the frozen `n_dk`/`n_k` snapshot; each
/// word's contribution to `n_k` is accumulated locally and reduced onto
/// the shared table once, after every word has been processed.
#[allow(clippy::too_many_arguments)]
pub fn word_sweep_parallel(
    store: &mut TokenStore,
    counts: &mut CountTables,
    alpha: f64,
    beta: f64,
    v_beta: f64,
    update_topics: bool,
    seed: u64,
    iteration: u64,
) {
    use rayon::prelude::*;

    let n_words = store.n_words();
    if n_words < PARALLEL_ROW_THRESHOLD {
        word_sweep(store, counts, alpha, beta, v_beta, update_topics, seed, iteration);
        return;
    }
    let n_topics = store.n_topics();
    let n_docs = store.n_docs();
    let store_ref: &TokenStore = store;
    let n_dk: &Matrix<f64> = counts.n_dk_matrix();
    let n_k: &Vector<f64> = counts.n_k_vec();

    let results: Vec<(Vec<f64>, Vec<f64>, Vec<(usize, usize)>)> = (0..n_words)
        .into_par_iter()
        .map(|w| {
            let mut rng = seeded_rng(
                seed,
                iteration
                    .wrapping_mul(1_000_003)
                    .wrapping_add(n_docs as u64)
                    .wrapping_add(w as u64),
            );
            let mut row = counts.n_wk_row(w).to_vec();
            let mut delta_k = vec![0.0; n_topics];
            let changes = sweep_word(
                store_ref, n_dk, n_k, alpha, beta, v_beta, n_topics, w, &mut row, &mut delta_k, update_topics, &mut rng,
            );
            (row, delta_k, changes)
        })
        .collect();

    let mut total_delta_k = vec![0.0; n_topics];
    for (w, (row, delta_k, changes)) in results.into_iter().enumerate() {
        if update_topics {
            counts.set_n_wk_row(w, &row);
            for k in 0..n_topics {
                total_delta_k[k] += delta_k[k];
            }
        }
        for (t, topic) in changes {
            if update_topics {
                store.commit(t, topic);
            } else {
                store.advance(t, topic);
            }
        }
    }
    if update_topics {
        counts.add_to_n_k(&total_delta_k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::CsrMatrix;

    fn tiny_store_and_counts(seed: u64) -> (TokenStore, CountTables) {
        let dtm = CsrMatrix::from_rows(
            vec![vec![(0, 4), (1, 4)], vec![(2, 4), (3, 4)]],
            4,
            vec!["d0".into(), "d1".into()],
            Some(vec!["a".into(), "b".into(), "c".into(), "d".into()]),
        )
        .unwrap();
        let store = TokenStore::build(&dtm, 2, seed);
        let counts = CountTables::init_from_store(&store);
        (store, counts)
    }

    #[test]
    fn test_doc_sweep_preserves_doc_lengths() {
        let (mut store, mut counts) = tiny_store_and_counts(11);
        for iter in 0..5 {
            doc_sweep(&mut store, &mut counts, 0.1, 0.1, 0.4, 99, iter);
        }
        for d in 0..store.n_docs() {
            let row_sum: f64 = counts.n_dk_row(d).iter().sum();
            assert_eq!(row_sum as usize, store.doc_len(d));
        }
    }

    #[test]
    fn test_word_sweep_preserves_count_invariants() {
        let (mut store, mut counts) = tiny_store_and_counts(12);
        for iter in 0..5 {
            word_sweep(&mut store, &mut counts, 0.1, 0.1, 0.4, true, 17, iter);
        }
        counts.assert_consistent(1e-6);
    }

    #[test]
    fn test_word_sweep_frozen_when_not_updating_topics() {
        let (mut store, mut counts) = tiny_store_and_counts(13);
        let before = counts.n_wk_matrix().clone();
        word_sweep(&mut store, &mut counts, 0.1, 0.1, 0.4, false, 5, 0);
        assert_eq!(counts.n_wk_matrix(), &before);
    }

    #[test]
    fn test_full_iteration_preserves_invariants() {
        let (mut store, mut counts) = tiny_store_and_counts(14);
        for iter in 0..10 {
            doc_sweep(&mut store, &mut counts, 0.1, 0.1, 0.4, 3, iter);
            word_sweep(&mut store, &mut counts, 0.1, 0.1, 0.4, true, 4, iter);
            counts.assert_consistent(1e-6);
            for d in 0..store.n_docs() {
                let row_sum: f64 = counts.n_dk_row(d).iter().sum();
                assert_eq!(row_sum as usize, store.doc_len(d));
            }
        }
    }
}
