//! The pseudo-log-likelihood used to track and early-stop training.
//!
//! ```text
//! l = sum_w sum_k lgamma(n_wk[w][k] + beta) - V*K*lgamma(beta)
//!     - sum_k lgamma(n_k[k] + V*beta) + K*lgamma(V*beta)
//! ```
//!
//! This is the log of the Dirichlet-multinomial marginal likelihood of
//! the word-topic counts under the topic-word prior, dropping the
//! document side.

use crate::counts::CountTables;
use crate::linalg::{Matrix, Vector};
use statrs::function::gamma::ln_gamma;

/// Compute the pseudo-log-likelihood of the current word-topic counts.
pub fn pseudo_log_likelihood(counts: &CountTables, beta: f64, v_beta: f64) -> f64 {
    let (n_topics, n_words, _n_docs) = counts.shape();
    pseudo_log_likelihood_raw(counts.n_wk_matrix(), counts.n_k_vec(), n_words, n_topics, beta, v_beta)
}

/// Same computation as [`pseudo_log_likelihood`], but against a raw
/// `(n_wk, n_k)` pair rather than a full [`CountTables`] — used by the
/// distributed coordinator, which only ever reduces `GlobalSnapshot`s
/// and never holds a full `n_dk`.
pub fn pseudo_log_likelihood_raw(n_wk: &Matrix<f64>, n_k: &Vector<f64>, n_words: usize, n_topics: usize, beta: f64, v_beta: f64) -> f64 {
    let mut ll = 0.0;
    for w in 0..n_words {
        for k in 0..n_topics {
            ll += ln_gamma(n_wk[[w, k]] + beta);
        }
    }
    ll -= (n_words * n_topics) as f64 * ln_gamma(beta);
    for k in 0..n_topics {
        ll -= ln_gamma(n_k[k] + v_beta);
    }
    ll += n_topics as f64 * ln_gamma(v_beta);
    ll
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::CsrMatrix;
    use crate::token_store::TokenStore;

    fn tiny_counts() -> CountTables {
        let dtm = CsrMatrix::from_rows(
            vec![vec![(0, 3), (1, 2)], vec![(1, 1), (2, 4)]],
            3,
            vec!["d0".into(), "d1".into()],
            Some(vec!["a".into(), "b".into(), "c".into()]),
        )
        .unwrap();
        let store = TokenStore::build(&dtm, 3, 5);
        CountTables::init_from_store(&store)
    }

    #[test]
    fn test_likelihood_is_negative() {
        let counts = tiny_counts();
        let beta = 0.1;
        let v_beta = beta * 3.0;
        let ll = pseudo_log_likelihood(&counts, beta, v_beta);
        assert!(ll < 0.0);
    }

    #[test]
    fn test_likelihood_is_finite() {
        let counts = tiny_counts();
        let ll = pseudo_log_likelihood(&counts, 0.05, 0.15);
        assert!(ll.is_finite());
    }
}
