//! The two proposal distributions and the Metropolis-Hastings
//! acceptance ratio.
//!
//! The document proposal is drawn with an exact O(1) trick:
//! `q_d(k) ∝ n_dk[d][k] + α` has no per-topic denominator, so
//! "pick the topic of a uniformly chosen existing token in `d`, else draw
//! uniformly" reproduces it exactly.
//!
//! The word proposal `q_w(k) ∝ (n_wk[w][k] + β) / (n_k[k] + Vβ)` carries a
//! per-topic denominator, so the same trick alone only reproduces the
//! numerator; this implementation draws it as an explicit `O(K)`
//! categorical distribution instead of the paper's alias-table
//! accept/reject scheme, trading the sampler's asymptotic per-token cost
//! for an implementation whose correctness doesn't depend on a subtle
//! rejection-retry bound. See `DESIGN.md` for the full tradeoff.

use crate::counts::CountTables;
use crate::rand_utils::{choose_from, uniform_index};
use crate::token_store::TokenStore;
use rand::Rng;

/// Draw a proposed topic from the document proposal `q_d(k) ∝ n_dk[d][k] + α`
/// for a token in document `d`.
pub fn sample_doc_proposal<R: Rng + ?Sized>(
    rng: &mut R,
    store: &TokenStore,
    alpha: f64,
    n_topics: usize,
    d: usize,
) -> usize {
    let len_d = store.doc_len(d);
    let threshold = len_d as f64 + n_topics as f64 * alpha;
    let r = rng.gen_range(0.0..threshold);
    if r < len_d as f64 {
        let range = store.doc_token_range(d);
        let pick = range.start + uniform_index(rng, range.len());
        store.get_z(pick)
    } else {
        uniform_index(rng, n_topics)
    }
}

/// Density (up to a missing `1/Σ`) of the document proposal at topic `k`,
/// used by the MH acceptance ratio.
pub fn doc_proposal_density(counts: &CountTables, alpha: f64, d: usize, k: usize) -> f64 {
    counts.n_dk(d, k) + alpha
}

/// Draw a proposed topic from the word proposal
/// `q_w(k) ∝ (n_wk[w][k] + β) / (n_k[k] + Vβ)` for a token of word `w`,
/// against the *stale* snapshot currently held in `counts`.
pub fn sample_word_proposal<R: Rng + ?Sized>(
    rng: &mut R,
    counts: &CountTables,
    beta: f64,
    v_beta: f64,
    n_topics: usize,
    w: usize,
) -> usize {
    let weights: Vec<f64> = (0..n_topics)
        .map(|k| (counts.n_wk(w, k) + beta) / (counts.n_k(k) + v_beta))
        .collect();
    choose_from(rng, &weights)
}

/// Density (up to a missing `1/Σ`) of the word proposal at topic `k`.
pub fn word_proposal_density(counts: &CountTables, beta: f64, v_beta: f64, w: usize, k: usize) -> f64 {
    (counts.n_wk(w, k) + beta) / (counts.n_k(k) + v_beta)
}

/// The collapsed Gibbs target, up to the normalizing constant:
/// `p(k) ∝ (n_dk[d][k] + α) · (n_wk[w][k] + β) / (n_k[k] + Vβ)`.
pub fn target_density(
    counts: &CountTables,
    alpha: f64,
    beta: f64,
    v_beta: f64,
    d: usize,
    w: usize,
    k: usize,
) -> f64 {
    doc_proposal_density(counts, alpha, d, k) * word_proposal_density(counts, beta, v_beta, w, k)
}

/// Metropolis-Hastings acceptance probability for moving a token currently
/// at topic `s` to the proposed topic `t`, against proposal density `q`:
/// `π = min(1, [p(t)/p(s)] · [q(s)/q(t)])`.
///
/// `target` computes `p(k)` and `proposal` computes `q(k)`, both up to a
/// shared missing normalizing constant (which cancels in the ratios).
pub fn mh_accept<R: Rng + ?Sized>(
    rng: &mut R,
    s: usize,
    t: usize,
    target: impl Fn(usize) -> f64,
    proposal: impl Fn(usize) -> f64,
) -> bool {
    if s == t {
        return true;
    }
    let p_t = target(t);
    let p_s = target(s);
    let q_s = proposal(s);
    let q_t = proposal(t);
    if p_s <= 0.0 || q_t <= 0.0 {
        return true;
    }
    let ratio = (p_t / p_s) * (q_s / q_t);
    if !ratio.is_finite() {
        return true;
    }
    ratio >= 1.0 || rng.gen_range(0.0..1.0) < ratio
}
