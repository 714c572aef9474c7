//! Randomised reviewer selection.
//!
//! The random source is owned by the selector so callers can inject a seeded
//! generator and get reproducible picks.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Picks reviewers uniformly at random, without repetition.
pub struct ReviewerSelector {
    rng: Mutex<StdRng>,
}

impl ReviewerSelector {
    /// Selector seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic selector for tests and reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Sample `min(count, eligible.len())` distinct entries.
    ///
    /// Every ordering of every subset is equally likely. `eligible` itself is
    /// left untouched; sampling happens on a copy.
    pub fn select<T: Clone>(&self, eligible: &[T], count: usize) -> Vec<T> {
        if eligible.is_empty() || count == 0 {
            return Vec::new();
        }

        let mut pool = eligible.to_vec();
        let amount = count.min(pool.len());
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (picked, _) = pool.partial_shuffle(&mut *rng, amount);
        picked.to_vec()
    }

    /// Shuffle `items` in place with the selector's random source.
    pub fn shuffle<T>(&self, items: &mut [T]) {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        items.shuffle(&mut *rng);
    }
}

impl Default for ReviewerSelector {
    fn default() -> Self {
        Self::from_entropy()
    }
}
