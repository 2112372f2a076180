//! Contracts with external collaborators.
//!
//! The engine never knows what a genotype means. It only needs an
//! [`Objective`] that scores and repairs genotypes, and an [`Initializer`]
//! that produces fresh ones.

use super::individual::Individual;
use rand::RngCore;

/// Bounds every genotype type must satisfy.
///
/// Blanket-implemented; users never implement it directly.
pub trait Genotype: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T: Clone + Send + Sync + std::fmt::Debug + 'static> Genotype for T {}

/// Optimization direction of an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Lower objective values are better.
    #[default]
    Minimize,
    /// Higher objective values are better.
    Maximize,
}

impl Direction {
    /// Maps a raw objective value to a fitness where higher is better.
    ///
    /// NaN maps to `f64::NEG_INFINITY`, so it ranks below every real value.
    pub fn normalize(self, value: f64) -> f64 {
        if value.is_nan() {
            return f64::NEG_INFINITY;
        }
        match self {
            Direction::Minimize => -value,
            Direction::Maximize => value,
        }
    }

    /// Inverse of [`normalize`](Self::normalize).
    pub fn denormalize(self, fitness: f64) -> f64 {
        // negation is its own inverse
        self.normalize(fitness)
    }
}

/// A black-box objective function.
///
/// # Repair contract
///
/// Operators may produce genotypes outside the feasible region. Every
/// strategy passes each new genotype through
/// [`repair_solution`](Objective::repair_solution) (and each velocity
/// through [`repair_speed`](Objective::repair_speed)) before it is
/// evaluated. An implementation that does not actually repair leaves the
/// caller responsible for feasibility.
///
/// # Examples
///
/// ```
/// use u_evosearch::core::{Direction, Objective};
///
/// struct Sphere;
///
/// impl Objective<Vec<f64>> for Sphere {
///     fn direction(&self) -> Direction { Direction::Minimize }
///     fn evaluate(&self, x: &Vec<f64>) -> f64 { x.iter().map(|v| v * v).sum() }
///     fn repair_solution(&self, x: Vec<f64>) -> Vec<f64> {
///         x.into_iter().map(|v| v.clamp(-5.0, 5.0)).collect()
///     }
/// }
///
/// assert_eq!(Sphere.fitness(&vec![1.0, 2.0]), -5.0);
/// ```
pub trait Objective<G>: Send + Sync {
    /// Whether the raw objective is minimized or maximized.
    fn direction(&self) -> Direction;

    /// Computes the raw objective value of a genotype.
    fn evaluate(&self, genotype: &G) -> f64;

    /// Maps a genotype back into the feasible region.
    fn repair_solution(&self, genotype: G) -> G;

    /// Maps a velocity back into its feasible region.
    fn repair_speed(&self, velocity: G) -> G {
        velocity
    }

    /// Normalized fitness: higher is better regardless of direction.
    fn fitness(&self, genotype: &G) -> f64 {
        self.direction().normalize(self.evaluate(genotype))
    }
}

/// Produces new genotypes and tracks the configured population size.
///
/// Strategies whose population grows or shrinks (the coral reef) rewrite
/// [`pop_size`](Initializer::pop_size) as the run progresses.
pub trait Initializer<G>: Send + Sync {
    /// Currently configured population size.
    fn pop_size(&self) -> usize;

    /// Updates the configured population size.
    fn set_pop_size(&mut self, size: usize);

    /// Generates one random genotype.
    fn generate_random(&self, rng: &mut dyn RngCore) -> G;

    /// Generates one unevaluated individual.
    fn generate_individual(&self, rng: &mut dyn RngCore) -> Individual<G> {
        Individual::new(self.generate_random(rng))
    }

    /// Generates `count` unevaluated individuals.
    fn generate_population(&self, count: usize, rng: &mut dyn RngCore) -> Vec<Individual<G>> {
        (0..count).map(|_| self.generate_individual(rng)).collect()
    }
}
