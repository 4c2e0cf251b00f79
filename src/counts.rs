//! The global count tables `n_wk`, `n_dk`, `n_k`, and their local
//! delta counterparts for distributed merging.

use crate::linalg::{Matrix, Vector};
use crate::token_store::TokenStore;

/// The three count tables plus a local delta, kept mutually consistent:
/// `sum_w n_wk[w][k] == n_k[k] == sum_d n_dk[d][k]` for every `k`.
#[derive(Debug, Clone)]
pub struct CountTables {
    n_wk: Matrix<f64>,
    n_dk: Matrix<f64>,
    n_k: Vector<f64>,
    delta_n_wk: Matrix<f64>,
    delta_n_k: Vector<f64>,
    n_words: usize,
    n_docs: usize,
    n_topics: usize,
}

impl CountTables {
    /// Empty tables of the given shape.
    pub fn zeros(n_docs: usize, n_words: usize, n_topics: usize) -> CountTables {
        CountTables {
            n_wk: Matrix::zeros(n_words, n_topics),
            n_dk: Matrix::zeros(n_docs, n_topics),
            n_k: Vector::zeros(n_topics),
            delta_n_wk: Matrix::zeros(n_words, n_topics),
            delta_n_k: Vector::zeros(n_topics),
            n_words,
            n_docs,
            n_topics,
        }
    }

    /// Build counts from a token store's current `z_new` assignments.
    pub fn init_from_store(store: &TokenStore) -> CountTables {
        let mut counts = CountTables::zeros(store.n_docs(), store.n_words(), store.n_topics());
        for d in 0..store.n_docs() {
            for tok in store.iter_by_doc(d) {
                counts.add(d, tok.w as usize, tok.z_new as usize);
            }
        }
        counts
    }

    /// Record one token of document `d`, word `w`, assigned to topic `k`:
    /// increments `n_dk`, `n_wk`, `n_k`, and the local delta.
    pub fn add(&mut self, d: usize, w: usize, k: usize) {
        self.n_dk[[d, k]] += 1.0;
        self.n_wk[[w, k]] += 1.0;
        self.n_k[k] += 1.0;
        self.delta_n_wk[[w, k]] += 1.0;
        self.delta_n_k[k] += 1.0;
    }

    /// Remove one token of document `d`, word `w`, currently at topic `k`:
    /// the inverse of [`add`](Self::add).
    pub fn remove(&mut self, d: usize, w: usize, k: usize) {
        self.n_dk[[d, k]] -= 1.0;
        self.n_wk[[w, k]] -= 1.0;
        self.n_k[k] -= 1.0;
        self.delta_n_wk[[w, k]] -= 1.0;
        self.delta_n_k[k] -= 1.0;
    }

    /// Doc-sweep-only update: touches `n_dk` alone. Word counts (`n_wk`,
    /// `n_k`) are treated as stale during the doc sweep.
    pub fn add_dk(&mut self, d: usize, k: usize) {
        self.n_dk[[d, k]] += 1.0;
    }

    /// Inverse of [`add_dk`](Self::add_dk).
    pub fn remove_dk(&mut self, d: usize, k: usize) {
        self.n_dk[[d, k]] -= 1.0;
    }

    /// Word-sweep-only update: touches `n_wk`/`n_k` and the local delta.
    /// Doc counts (`n_dk`) are treated as stale during the word sweep.
    pub fn add_wk(&mut self, w: usize, k: usize) {
        self.n_wk[[w, k]] += 1.0;
        self.n_k[k] += 1.0;
        self.delta_n_wk[[w, k]] += 1.0;
        self.delta_n_k[k] += 1.0;
    }

    /// Inverse of [`add_wk`](Self::add_wk).
    pub fn remove_wk(&mut self, w: usize, k: usize) {
        self.n_wk[[w, k]] -= 1.0;
        self.n_k[k] -= 1.0;
        self.delta_n_wk[[w, k]] -= 1.0;
        self.delta_n_k[k] -= 1.0;
    }

    /// Current `n_dk[d][k]`.
    pub fn n_dk(&self, d: usize, k: usize) -> f64 {
        self.n_dk[[d, k]]
    }

    /// Current `n_wk[w][k]`.
    pub fn n_wk(&self, w: usize, k: usize) -> f64 {
        self.n_wk[[w, k]]
    }

    /// Current `n_k[k]`.
    pub fn n_k(&self, k: usize) -> f64 {
        self.n_k[k]
    }

    /// Borrow document `d`'s topic-count row.
    pub fn n_dk_row(&self, d: usize) -> &[f64] {
        self.n_dk.row(d)
    }

    /// Borrow word `w`'s topic-count row.
    pub fn n_wk_row(&self, w: usize) -> &[f64] {
        self.n_wk.row(w)
    }

    /// Overwrite document `d`'s topic-count row, e.g. with the result of a
    /// doc sweep that worked against a local copy of the row.
    pub fn set_n_dk_row(&mut self, d: usize, row: &[f64]) {
        self.n_dk.row_mut(d).copy_from_slice(row);
    }

    /// Overwrite word `w`'s topic-count row, e.g. with the result of a
    /// word sweep that worked against a local copy of the row.
    pub fn set_n_wk_row(&mut self, w: usize, row: &[f64]) {
        for k in 0..self.n_topics {
            let change = row[k] - self.n_wk[[w, k]];
            self.delta_n_wk[[w, k]] += change;
        }
        self.n_wk.row_mut(w).copy_from_slice(row);
    }

    /// Add a word sweep's accumulated local change to `n_k` onto the
    /// global topic totals and the local delta.
    pub fn add_to_n_k(&mut self, delta: &[f64]) {
        for k in 0..self.n_topics {
            self.n_k[k] += delta[k];
            self.delta_n_k[k] += delta[k];
        }
    }

    /// Borrow the topic-total vector.
    pub fn n_k_vec(&self) -> &Vector<f64> {
        &self.n_k
    }

    /// Borrow the full `n_wk` table.
    pub fn n_wk_matrix(&self) -> &Matrix<f64> {
        &self.n_wk
    }

    /// Borrow the full `n_dk` table.
    pub fn n_dk_matrix(&self) -> &Matrix<f64> {
        &self.n_dk
    }

    /// Topic count, vocabulary size, document count.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.n_topics, self.n_words, self.n_docs)
    }

    /// Snapshot of the global (`n_wk`, `n_k`) tables, for shipping to
    /// distributed workers.
    pub fn snapshot_global(&self) -> GlobalSnapshot {
        GlobalSnapshot {
            n_wk: self.n_wk.clone(),
            n_k: self.n_k.clone(),
        }
    }

    /// Overwrite the global `n_wk`/`n_k` tables from a snapshot, e.g. one
    /// broadcast by the distributed coordinator.
    pub fn set_global(&mut self, snapshot: &GlobalSnapshot) {
        self.n_wk = snapshot.n_wk.clone();
        self.n_k = snapshot.n_k.clone();
    }

    /// This worker's accumulated change to `n_wk`/`n_k` since the last
    /// [`reset_local`](Self::reset_local).
    pub fn local_delta(&self) -> GlobalSnapshot {
        GlobalSnapshot {
            n_wk: self.delta_n_wk.clone(),
            n_k: self.delta_n_k.clone(),
        }
    }

    /// Zero the local delta without touching the global tables.
    pub fn reset_local(&mut self) {
        self.delta_n_wk = Matrix::zeros(self.n_words, self.n_topics);
        self.delta_n_k = Vector::zeros(self.n_topics);
    }

    /// Add another worker's delta onto this table's global `n_wk`/`n_k`.
    pub fn apply_delta(&mut self, delta: &GlobalSnapshot) {
        for (dst, src) in self.n_wk.row_iter_mut().zip(delta.n_wk.row_iter()) {
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d += s;
            }
        }
        for k in 0..self.n_topics {
            self.n_k[k] += delta.n_k[k];
        }
    }

    /// Check `sum_w n_wk[w][k] == n_k[k] == sum_d n_dk[d][k]` for all `k`,
    /// within floating-point tolerance.
    #[cfg(test)]
    pub fn assert_consistent(&self, tol: f64) {
        let col_sum_wk = self.n_wk.sum_cols();
        let col_sum_dk = self.n_dk.sum_cols();
        for k in 0..self.n_topics {
            assert!(
                (col_sum_wk[k] - self.n_k[k]).abs() < tol,
                "n_wk column sum != n_k for topic {k}"
            );
            assert!(
                (col_sum_dk[k] - self.n_k[k]).abs() < tol,
                "n_dk column sum != n_k for topic {k}"
            );
        }
    }
}

/// A snapshot of the global count tables that actually cross the
/// sampler's "stale counts" boundary: `n_wk` and `n_k`. `n_dk` is never
/// shared between workers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GlobalSnapshot {
    /// Word-by-topic counts.
    pub n_wk: Matrix<f64>,
    /// Topic totals.
    pub n_k: Vector<f64>,
}
