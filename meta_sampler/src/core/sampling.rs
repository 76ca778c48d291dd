//! Sampling without replacement over the ranked population
//!
//! The pool owns the population snapshot and the set of indices already
//! handed out, so no participant is ever drawn twice within a run.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use shared::ParticipantRef;
use std::collections::BTreeSet;

/// Population plus the indices already drawn from it
pub struct SamplingPool {
    population: Vec<ParticipantRef>,
    used: BTreeSet<usize>,
    rng: StdRng,
}

impl SamplingPool {
    /// Create a pool over a population snapshot with an entropy-seeded RNG
    pub fn new(population: Vec<ParticipantRef>) -> Self {
        Self::with_rng(population, StdRng::from_entropy())
    }

    /// Create a pool with a fixed seed for reproducible draws
    pub fn with_seed(population: Vec<ParticipantRef>, seed: u64) -> Self {
        Self::with_rng(population, StdRng::seed_from_u64(seed))
    }

    fn with_rng(population: Vec<ParticipantRef>, rng: StdRng) -> Self {
        Self {
            population,
            used: BTreeSet::new(),
            rng,
        }
    }

    /// Draw the initial cohort of up to `k` participants.
    ///
    /// On a fresh pool this is a uniform draw over the whole population. If
    /// indices were already handed out they are excluded, so the
    /// no-duplicate guarantee holds regardless of call order.
    pub fn sample_initial(&mut self, k: usize) -> Vec<ParticipantRef> {
        self.draw(k)
    }

    /// Draw up to `k` more participants from the unused indices.
    ///
    /// Returns an empty batch once the population is exhausted.
    pub fn sample_more(&mut self, k: usize) -> Vec<ParticipantRef> {
        self.draw(k)
    }

    fn draw(&mut self, k: usize) -> Vec<ParticipantRef> {
        let unused: Vec<usize> = (0..self.population.len())
            .filter(|i| !self.used.contains(i))
            .collect();

        let amount = k.min(unused.len());
        if amount == 0 {
            return Vec::new();
        }

        let picked: Vec<usize> = index::sample(&mut self.rng, unused.len(), amount)
            .into_iter()
            .map(|position| unused[position])
            .collect();

        self.used.extend(picked.iter().copied());
        picked
            .into_iter()
            .map(|i| self.population[i].clone())
            .collect()
    }

    /// Number of population members not yet drawn
    pub fn remaining(&self) -> usize {
        self.population.len() - self.used.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn population(&self) -> &[ParticipantRef] {
        &self.population
    }

    pub fn population_size(&self) -> usize {
        self.population.len()
    }

    pub fn used_indices(&self) -> &BTreeSet<usize> {
        &self.used
    }
}
