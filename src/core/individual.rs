//! Candidate solutions.

use super::types::Objective;

/// A candidate solution with a cached, normalized fitness.
///
/// Fitness is stored so that higher is always better (see
/// [`Direction::normalize`](super::Direction::normalize)). It is computed
/// lazily by [`evaluate`](Individual::evaluate) and invalidated whenever the
/// genotype is replaced.
///
/// Operators never mutate an individual owned by a population; they build a
/// new one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Individual<G> {
    genotype: G,
    velocity: Option<G>,
    fitness: Option<f64>,
    personal_best: Option<Box<Individual<G>>>,
}

impl<G> Individual<G> {
    /// Creates an unevaluated individual.
    pub fn new(genotype: G) -> Self {
        Self {
            genotype,
            velocity: None,
            fitness: None,
            personal_best: None,
        }
    }

    /// Creates an unevaluated individual carrying a velocity.
    pub fn with_velocity(genotype: G, velocity: G) -> Self {
        Self {
            velocity: Some(velocity),
            ..Self::new(genotype)
        }
    }

    pub fn genotype(&self) -> &G {
        &self.genotype
    }

    pub fn into_genotype(self) -> G {
        self.genotype
    }

    /// Replaces the genotype and drops the cached fitness.
    pub fn set_genotype(&mut self, genotype: G) {
        self.genotype = genotype;
        self.fitness = None;
    }

    pub fn velocity(&self) -> Option<&G> {
        self.velocity.as_ref()
    }

    pub fn set_velocity(&mut self, velocity: Option<G>) {
        self.velocity = velocity;
    }

    /// Cached fitness, or `f64::NEG_INFINITY` when not yet evaluated.
    pub fn fitness(&self) -> f64 {
        self.fitness.unwrap_or(f64::NEG_INFINITY)
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Stores an already computed normalized fitness. NaN is stored as
    /// `f64::NEG_INFINITY`.
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(if fitness.is_nan() { f64::NEG_INFINITY } else { fitness });
    }

    /// Computes the fitness if it is not cached.
    ///
    /// Returns `true` when the objective was actually called.
    pub fn evaluate<O: Objective<G> + ?Sized>(&mut self, objective: &O) -> bool {
        if self.fitness.is_some() {
            return false;
        }
        self.fitness = Some(objective.fitness(&self.genotype));
        true
    }

    /// Passes genotype and velocity through the objective's repair hooks.
    pub fn repaired<O: Objective<G> + ?Sized>(self, objective: &O) -> Self {
        let Individual {
            genotype,
            velocity,
            fitness: _,
            personal_best,
        } = self;
        Self {
            genotype: objective.repair_solution(genotype),
            velocity: velocity.map(|v| objective.repair_speed(v)),
            fitness: None,
            personal_best,
        }
    }

    pub fn personal_best(&self) -> Option<&Individual<G>> {
        self.personal_best.as_deref()
    }
}

impl<G: Clone> Individual<G> {
    /// Remembers `candidate` as personal best if it beats the current one.
    pub fn store_best(&mut self, candidate: &Individual<G>) {
        let current = self
            .personal_best
            .as_ref()
            .map_or(f64::NEG_INFINITY, |b| b.fitness());
        if candidate.fitness() > current {
            let mut snapshot = candidate.clone();
            snapshot.personal_best = None;
            self.personal_best = Some(Box::new(snapshot));
        }
    }
}

/// Returns the fittest individual (first on ties).
///
/// # Panics
/// Panics if `population` is empty.
pub fn fittest<G>(population: &[Individual<G>]) -> &Individual<G> {
    population
        .iter()
        .reduce(|best, ind| if ind.fitness() > best.fitness() { ind } else { best })
        .expect("population must not be empty")
}

/// Sorts best first. Stable, so equal fitness keeps its original order.
pub fn sort_descending<G>(population: &mut [Individual<G>]) {
    population.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
}
