//! Random-source helpers.
//!
//! Every stochastic decision in the crate draws from an explicit generator
//! passed by the caller, so a seeded run is reproducible end to end.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Creates a seeded generator.
pub fn create_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Draws an index with probability proportional to `weights`.
///
/// Falls back to a uniform draw when the weights do not sum to a positive
/// finite value.
///
/// # Panics
/// Panics if `weights` is empty.
pub fn weighted_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    assert!(!weights.is_empty(), "cannot sample from empty weights");

    let total: f64 = weights.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        return rng.random_range(0..weights.len());
    }

    let mut roll = rng.random_range(0.0..total);
    for (i, &w) in weights.iter().enumerate() {
        roll -= w;
        if roll < 0.0 {
            return i;
        }
    }
    weights.len() - 1 // floating-point fallback
}

/// Draws `k` indices in `0..n` uniformly with replacement.
pub fn uniform_choices<R: Rng + ?Sized>(n: usize, k: usize, rng: &mut R) -> Vec<usize> {
    (0..k).map(|_| rng.random_range(0..n)).collect()
}

/// Draws `k` indices with replacement, proportional to `weights`.
pub fn weighted_choices<R: Rng + ?Sized>(weights: &[f64], k: usize, rng: &mut R) -> Vec<usize> {
    (0..k).map(|_| weighted_index(weights, rng)).collect()
}
