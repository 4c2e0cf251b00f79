//! RNG helpers.
//!
//! Small RNG-related helpers live behind this module rather than being
//! scattered through model code, and every draw is seeded explicitly from
//! a user-supplied seed rather than from an unseeded thread-local RNG, so
//! a run is reproducible given the same seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Derive a per-task `StdRng` from a user seed and a task id (a worker
/// index, a row index, ...), so that splitting work across threads never
/// changes the result for a fixed top-level seed.
pub fn seeded_rng(seed: u64, task_id: u64) -> StdRng {
    // splitmix64-style mixing so nearby task ids don't produce correlated streams.
    let mut z = seed.wrapping_add(task_id.wrapping_mul(0x9E3779B97F4A7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^= z >> 31;
    StdRng::seed_from_u64(z)
}

/// Draw a uniform integer in `[0, n)`.
pub fn uniform_index<R: Rng + ?Sized>(rng: &mut R, n: usize) -> usize {
    rng.gen_range(0..n)
}

/// Sample an index from the categorical distribution given by
/// `weights`, which need not be normalized. Used by the proposal sampler's
/// accept/reject step.
pub fn choose_from<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> usize {
    let total: f64 = weights.iter().sum();
    let target = rng.gen_range(0.0..total);
    let mut acc = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        acc += w;
        if acc >= target {
            return i;
        }
    }
    weights.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_rng_deterministic() {
        let mut a = seeded_rng(42, 7);
        let mut b = seeded_rng(42, 7);
        let xs: Vec<u32> = (0..5).map(|_| a.gen()).collect();
        let ys: Vec<u32> = (0..5).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_seeded_rng_differs_by_task() {
        let mut a = seeded_rng(42, 1);
        let mut b = seeded_rng(42, 2);
        let x: u64 = a.gen();
        let y: u64 = b.gen();
        assert_ne!(x, y);
    }

    #[test]
    fn test_choose_from_picks_sole_nonzero() {
        let mut rng = seeded_rng(1, 0);
        for _ in 0..20 {
            assert_eq!(choose_from(&mut rng, &[0.0, 0.0, 5.0, 0.0]), 2);
        }
    }
}
