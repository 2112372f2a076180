//! Search strategies.
//!
//! Every strategy runs the same generation cycle:
//!
//! ```text
//! SELECT_PARENTS → PERTURB → EVALUATE → SELECT_SURVIVORS → UPDATE_PARAMS
//! ```
//!
//! Implementors of [`SearchStrategy`] supply the phases; the provided
//! [`step`](SearchStrategy::step) sequences them and maintains the
//! [`SearchState`] (population, best-known individual, counters).
//!
//! # Strategies
//!
//! - [`StaticPopulation`]: one offspring per parent
//! - [`VariablePopulation`]: a configurable number of offspring
//! - [`HillClimb`]: repeated local perturbation keeping improvements
//! - [`genetic_algorithm`]: mutation and crossover over a variable population
//! - [`gaussian_umda`], [`binomial_umda`]: estimation of distribution over
//!   real and integer vectors
//! - [`CroSl`](crate::cro::CroSl): the coral reef family
//!
//! # Repair
//!
//! Strategies route every operator call through [`apply_operator`], which
//! repairs the produced genotype and velocity before anything evaluates it.

mod eda;
mod ga;
mod hill_climb;
mod static_population;
mod variable_population;

pub use eda::{binomial_umda, gaussian_umda, BinomialModel, GaussianModel, Model, Umda};
pub use ga::genetic_algorithm;
pub use hill_climb::HillClimb;
pub use static_population::StaticPopulation;
pub use variable_population::VariablePopulation;

use crate::core::{fittest, Genotype, Individual, Initializer, Objective, Operator, OperatorContext, Params};
use crate::error::{ConfigError, EvoResult};
use rand::RngCore;

/// Applies `operator` and repairs the result.
///
/// The returned individual is unevaluated.
pub fn apply_operator<G, O: Operator<G> + ?Sized>(
    operator: &O,
    individual: &Individual<G>,
    ctx: &OperatorContext<'_, G>,
    rng: &mut dyn RngCore,
) -> Individual<G> {
    operator.evolve(individual, ctx, rng).repaired(ctx.objective)
}

/// Evaluates every individual whose fitness is not cached.
///
/// Returns the number of objective calls. With the `parallel` feature and
/// `parallel == true` the calls run on the rayon thread pool.
pub fn evaluate_population<G: Genotype>(
    population: &mut [Individual<G>],
    objective: &dyn Objective<G>,
    parallel: bool,
) -> usize {
    #[cfg(feature = "parallel")]
    if parallel {
        use rayon::prelude::*;
        return population
            .par_iter_mut()
            .map(|ind| usize::from(ind.evaluate(objective)))
            .sum();
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    population
        .iter_mut()
        .map(|ind| usize::from(ind.evaluate(objective)))
        .sum()
}

/// Asserts the perturbation input is usable.
///
/// # Panics
/// Panics if `parents` is empty.
pub(crate) fn check_parents<G>(parents: &[Individual<G>], strategy: &str) {
    assert!(
        !parents.is_empty(),
        "{strategy}: cannot perturb an empty parent list"
    );
}

/// Rejects an initializer that would produce an empty population.
pub(crate) fn check_pop_size<G>(initializer: &dyn Initializer<G>) -> EvoResult<()> {
    let size = initializer.pop_size();
    if size == 0 {
        return Err(ConfigError::PopulationTooSmall { size, min: 1 });
    }
    Ok(())
}

/// Mutable state shared by every strategy.
#[derive(Debug, Clone)]
pub struct SearchState<G> {
    population: Vec<Individual<G>>,
    best: Option<Individual<G>>,
    generation: usize,
    evaluations: usize,
    progress: f64,
    parallel: bool,
    initialized: bool,
}

impl<G> Default for SearchState<G> {
    fn default() -> Self {
        Self {
            population: Vec::new(),
            best: None,
            generation: 0,
            evaluations: 0,
            progress: 0.0,
            parallel: false,
            initialized: false,
        }
    }
}

impl<G: Genotype> SearchState<G> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn population(&self) -> &[Individual<G>] {
        &self.population
    }

    /// Best individual seen so far, `None` before initialization.
    pub fn best(&self) -> Option<&Individual<G>> {
        self.best.as_ref()
    }

    /// Completed generations.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Objective calls so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Progress passed to the last [`SearchStrategy::step`].
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Enables parallel evaluation (effective with the `parallel` feature).
    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    /// Evaluates pending individuals and counts the objective calls.
    pub fn evaluate(&mut self, population: &mut [Individual<G>], objective: &dyn Objective<G>) {
        self.evaluations += evaluate_population(population, objective, self.parallel);
    }

    /// Adds objective calls made outside [`evaluate`](Self::evaluate).
    pub fn record_evaluations(&mut self, count: usize) {
        self.evaluations += count;
    }

    /// Replaces the best individual if a candidate is strictly fitter.
    ///
    /// Returns whether the best changed.
    pub fn update_best(&mut self, candidates: &[Individual<G>]) -> bool {
        if candidates.is_empty() {
            return false;
        }
        let candidate = fittest(candidates);
        let improved = self
            .best
            .as_ref()
            .map_or(true, |best| candidate.fitness() > best.fitness());
        if improved {
            self.best = Some(candidate.clone());
        }
        improved
    }

    /// Installs the first population.
    pub fn reset(&mut self, population: Vec<Individual<G>>) {
        self.generation = 0;
        self.progress = 0.0;
        self.best = None;
        self.update_best(&population);
        self.population = population;
        self.initialized = true;
    }

    fn take_population(&mut self) -> Vec<Individual<G>> {
        std::mem::take(&mut self.population)
    }

    fn advance(&mut self, survivors: Vec<Individual<G>>, progress: f64) {
        self.update_best(&survivors);
        self.population = survivors;
        self.generation += 1;
        self.progress = progress;
    }
}

/// Borrowed view of the state after one generation.
#[derive(Debug, Clone, Copy)]
pub struct StepOutcome<'a, G> {
    pub best: &'a Individual<G>,
    pub population: &'a [Individual<G>],
}

/// Owned, serializable picture of a strategy.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrategySnapshot<G> {
    pub name: String,
    pub generation: usize,
    pub evaluations: usize,
    pub progress: f64,
    pub best: Option<Individual<G>>,
    pub population: Vec<Individual<G>>,
    /// Strategy-specific values (operator weights, scheduled parameters).
    pub extra: Params,
}

/// A population-based search strategy.
///
/// Only the phases are strategy specific. The provided
/// [`initialize`](Self::initialize) and [`step`](Self::step) keep the
/// [`SearchState`] consistent: fitness is resolved before survivor
/// selection, and the best individual only changes on strict improvement.
///
/// The trait is object safe, so runners can drive `Box<dyn SearchStrategy<G>>`.
pub trait SearchStrategy<G: Genotype> {
    /// Display name.
    fn name(&self) -> &str;

    fn state(&self) -> &SearchState<G>;

    fn state_mut(&mut self) -> &mut SearchState<G>;

    fn initializer(&self) -> &dyn Initializer<G>;

    /// Checks that the strategy can run.
    ///
    /// The default rejects an empty initial population. [`SearchRunner`]
    /// calls this before initializing.
    ///
    /// [`SearchRunner`]: crate::runner::SearchRunner
    fn validate(&self) -> EvoResult<()> {
        check_pop_size(self.initializer())
    }

    /// Generates and evaluates the initial population.
    fn initialize(&mut self, objective: &dyn Objective<G>, rng: &mut dyn RngCore) {
        let initializer = self.initializer();
        let mut population = initializer.generate_population(initializer.pop_size(), rng);
        let state = self.state_mut();
        state.evaluate(&mut population, objective);
        state.reset(population);
    }

    /// Chooses the individuals to perturb. Defaults to the whole population.
    fn select_parents(
        &mut self,
        population: &[Individual<G>],
        _rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        population.to_vec()
    }

    /// Produces repaired and evaluated offspring.
    ///
    /// # Panics
    /// Implementations panic on an empty parent list.
    fn perturb(
        &mut self,
        parents: &[Individual<G>],
        objective: &dyn Objective<G>,
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>>;

    /// Chooses the next generation.
    fn select_individuals(
        &mut self,
        population: Vec<Individual<G>>,
        offspring: Vec<Individual<G>>,
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>>;

    /// Steps every schedulable component to `progress`.
    fn update_params(&mut self, progress: f64);

    /// Runs one generation.
    ///
    /// # Panics
    /// Panics if the strategy was not initialized.
    fn step(
        &mut self,
        objective: &dyn Objective<G>,
        progress: f64,
        rng: &mut dyn RngCore,
    ) -> StepOutcome<'_, G> {
        assert!(
            self.state().is_initialized(),
            "{}: initialize must be called before step",
            self.name()
        );

        let population = self.state_mut().take_population();
        let parents = self.select_parents(&population, rng);
        let offspring = self.perturb(&parents, objective, rng);
        self.state_mut().update_best(&offspring);

        let survivors = self.select_individuals(population, offspring, rng);
        self.state_mut().advance(survivors, progress);
        self.update_params(progress);

        let state = self.state();
        StepOutcome {
            best: state.best().expect("initialized strategy has a best individual"),
            population: state.population(),
        }
    }

    /// Strategy-specific values for [`snapshot`](Self::snapshot).
    fn extra(&self) -> Params {
        Params::new()
    }

    fn snapshot(&self) -> StrategySnapshot<G> {
        let state = self.state();
        StrategySnapshot {
            name: self.name().to_string(),
            generation: state.generation(),
            evaluations: state.evaluations(),
            progress: state.progress(),
            best: state.best().cloned(),
            population: state.population().to_vec(),
            extra: self.extra(),
        }
    }
}

impl<G: Genotype, S: SearchStrategy<G> + ?Sized> SearchStrategy<G> for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn state(&self) -> &SearchState<G> {
        (**self).state()
    }

    fn state_mut(&mut self) -> &mut SearchState<G> {
        (**self).state_mut()
    }

    fn initializer(&self) -> &dyn Initializer<G> {
        (**self).initializer()
    }

    fn validate(&self) -> EvoResult<()> {
        (**self).validate()
    }

    fn initialize(&mut self, objective: &dyn Objective<G>, rng: &mut dyn RngCore) {
        (**self).initialize(objective, rng)
    }

    fn select_parents(
        &mut self,
        population: &[Individual<G>],
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        (**self).select_parents(population, rng)
    }

    fn perturb(
        &mut self,
        parents: &[Individual<G>],
        objective: &dyn Objective<G>,
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        (**self).perturb(parents, objective, rng)
    }

    fn select_individuals(
        &mut self,
        population: Vec<Individual<G>>,
        offspring: Vec<Individual<G>>,
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        (**self).select_individuals(population, offspring, rng)
    }

    fn update_params(&mut self, progress: f64) {
        (**self).update_params(progress)
    }

    fn step(
        &mut self,
        objective: &dyn Objective<G>,
        progress: f64,
        rng: &mut dyn RngCore,
    ) -> StepOutcome<'_, G> {
        (**self).step(objective, progress, rng)
    }

    fn extra(&self) -> Params {
        (**self).extra()
    }
}
