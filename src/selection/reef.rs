//! Coral reef survivor selection.
//!
//! The reef is a fixed-capacity arena whose occupied slots form a prefix
//! `0..len`. Selection runs in two phases:
//!
//! 1. **Larval settling**: each larva draws up to `attempts` slot indices in
//!    `0..capacity`. A draw outside the occupied range appends the larva; a
//!    draw on an occupant strictly worse than the larva replaces it. A larva
//!    that exhausts its attempts is discarded.
//! 2. **Depredation**: the `floor(len * fd)` weakest corals are visited in
//!    ascending fitness order and each dies with probability `pd`. Visiting
//!    stops once only two corals are left alive, so the reef never goes
//!    extinct.
//!
//! # References
//!
//! - Salcedo-Sanz et al. (2014), "The Coral Reefs Optimization Algorithm: A
//!   Novel Metaheuristic for Efficiently Solving Optimization Problems"
//! - Salcedo-Sanz et al. (2017), "A coral reefs optimization algorithm with
//!   substrate layers for optimal design of multi-layered solar panels"

use crate::core::Individual;
use rand::Rng;

/// Minimum number of corals depredation leaves alive.
pub const REEF_FLOOR: usize = 2;

/// A fixed-capacity, possibly partially occupied population.
#[derive(Debug, Clone)]
pub struct Reef<G> {
    corals: Vec<Individual<G>>,
    capacity: usize,
}

impl<G> Reef<G> {
    /// Creates an empty reef.
    pub fn new(capacity: usize) -> Self {
        Self {
            corals: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Wraps an existing population (occupying slots `0..len`).
    pub fn from_population(corals: Vec<Individual<G>>, capacity: usize) -> Self {
        Self { corals, capacity }
    }

    pub fn len(&self) -> usize {
        self.corals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corals.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.corals.len() >= self.capacity
    }

    pub fn corals(&self) -> &[Individual<G>] {
        &self.corals
    }

    pub fn into_corals(self) -> Vec<Individual<G>> {
        self.corals
    }

    /// Tries to settle one larva. Returns whether it found a place.
    pub fn settle<R: Rng + ?Sized>(
        &mut self,
        larva: Individual<G>,
        attempts: usize,
        rng: &mut R,
    ) -> bool {
        if self.capacity == 0 {
            return false;
        }
        for _ in 0..attempts {
            let idx = rng.random_range(0..self.capacity);
            if idx >= self.corals.len() {
                self.corals.push(larva);
                return true;
            }
            if larva.fitness() > self.corals[idx].fitness() {
                self.corals[idx] = larva;
                return true;
            }
        }
        false
    }

    /// Settles larvae in order. Returns, per larva, whether it settled.
    pub fn settle_all<R: Rng + ?Sized>(
        &mut self,
        larvae: Vec<Individual<G>>,
        attempts: usize,
        rng: &mut R,
    ) -> Vec<bool> {
        larvae
            .into_iter()
            .map(|larva| self.settle(larva, attempts, &mut *rng))
            .collect()
    }

    /// Removes weak corals. Returns how many died.
    ///
    /// `fd` is the fraction of the reef exposed to depredation and `pd` the
    /// probability that an exposed coral dies.
    pub fn depredate<R: Rng + ?Sized>(&mut self, fd: f64, pd: f64, rng: &mut R) -> usize {
        let len = self.corals.len();
        let amount = ((len as f64 * fd).floor() as usize).min(len);
        if amount == 0 {
            return 0;
        }

        // stable: ties keep slot order
        let mut order: Vec<usize> = (0..len).collect();
        order.sort_by(|&a, &b| self.corals[a].fitness().total_cmp(&self.corals[b].fitness()));

        let mut dead = vec![false; len];
        let mut alive = len;
        for &idx in &order[..amount] {
            if alive <= REEF_FLOOR {
                break;
            }
            if rng.random_bool(pd) {
                dead[idx] = true;
                alive -= 1;
            }
        }

        let mut slot = 0;
        self.corals.retain(|_| {
            let keep = !dead[slot];
            slot += 1;
            keep
        });
        len - alive
    }
}

/// CRO survivor selection: settle `offspring` into `population`, then
/// depredate.
///
/// The result holds between 2 and `capacity` individuals (fewer only if
/// fewer than two were ever present).
pub fn cro_selection<G, R: Rng + ?Sized>(
    population: Vec<Individual<G>>,
    offspring: Vec<Individual<G>>,
    fd: f64,
    pd: f64,
    attempts: usize,
    capacity: usize,
    rng: &mut R,
) -> Vec<Individual<G>> {
    let mut reef = Reef::from_population(population, capacity);
    reef.settle_all(offspring, attempts, rng);
    reef.depredate(fd, pd, rng);
    reef.into_corals()
}
