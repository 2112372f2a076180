//! Generation loop execution.
//!
//! [`SearchRunner`] drives any [`SearchStrategy`]:
//! initialize → step → check stopping rules → repeat.

use super::config::SearchConfig;
use crate::core::{Genotype, Individual, Objective};
use crate::error::EvoResult;
use crate::random::create_rng;
use crate::strategy::SearchStrategy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, trace};

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopReason {
    MaxGenerations,
    MaxEvaluations,
    TimeLimit,
    /// The best individual reached `target_fitness`.
    TargetReached,
    /// `patience` generations passed without a strict improvement.
    Stagnation,
    Cancelled,
}

/// Result of a search run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchResult<G> {
    /// The best individual found during the entire run.
    pub best: Individual<G>,

    /// Raw objective value of `best`, in the objective's own direction.
    pub best_objective: f64,

    /// Total number of generations executed.
    pub generations: usize,

    /// Total number of objective calls.
    pub evaluations: usize,

    pub stop_reason: StopReason,

    /// Raw best objective value after initialization and after each
    /// generation.
    pub fitness_history: Vec<f64>,

    /// Wall-clock duration of the run in milliseconds.
    pub elapsed_ms: u64,
}

/// Executes the generation loop of a strategy.
///
/// # Usage
///
/// ```
/// use u_evosearch::core::{Direction, FnOperator, Individual, Initializer, Objective, Operator, Params};
/// use u_evosearch::cro::{CroConfig, CroSl};
/// use u_evosearch::runner::{SearchConfig, SearchRunner, StopReason};
/// use rand::{Rng, RngCore};
///
/// struct Abs;
/// impl Objective<f64> for Abs {
///     fn direction(&self) -> Direction { Direction::Minimize }
///     fn evaluate(&self, x: &f64) -> f64 { x.abs() }
///     fn repair_solution(&self, x: f64) -> f64 { x.clamp(-10.0, 10.0) }
/// }
///
/// struct Init(usize);
/// impl Initializer<f64> for Init {
///     fn pop_size(&self) -> usize { self.0 }
///     fn set_pop_size(&mut self, size: usize) { self.0 = size; }
///     fn generate_random(&self, rng: &mut dyn RngCore) -> f64 { rng.random_range(-10.0..10.0) }
/// }
///
/// let jitter = FnOperator::new("Jitter", Params::new(), |ind: &Individual<f64>, _ctx, _p: &Params, rng: &mut dyn RngCore| {
///     Individual::new(ind.genotype() + rng.random_range(-0.5..0.5))
/// });
/// let pool: Vec<Box<dyn Operator<f64>>> = vec![Box::new(jitter)];
/// let mut cro = CroSl::new(Init(20), pool, CroConfig::default()).unwrap();
///
/// let config = SearchConfig::default().with_max_generations(30).with_seed(7);
/// let result = SearchRunner::run(&mut cro, &Abs, &config).unwrap();
/// assert_eq!(result.generations, 30);
/// assert_eq!(result.stop_reason, StopReason::MaxGenerations);
/// assert!(result.best_objective <= result.fitness_history[0]);
/// ```
pub struct SearchRunner;

impl SearchRunner {
    /// Runs the strategy until a stopping rule fires.
    ///
    /// The strategy is (re)initialized at the start of the run.
    pub fn run<G, S>(
        strategy: &mut S,
        objective: &dyn Objective<G>,
        config: &SearchConfig,
    ) -> EvoResult<SearchResult<G>>
    where
        G: Genotype,
        S: SearchStrategy<G> + ?Sized,
    {
        Self::run_with_cancel(strategy, objective, config, None)
    }

    /// Runs the strategy with an optional cancellation token.
    ///
    /// If `cancel` is `Some` and the flag is set to `true`, the run stops
    /// before the next generation and returns the best solution so far.
    pub fn run_with_cancel<G, S>(
        strategy: &mut S,
        objective: &dyn Objective<G>,
        config: &SearchConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> EvoResult<SearchResult<G>>
    where
        G: Genotype,
        S: SearchStrategy<G> + ?Sized,
    {
        config.validate()?;
        strategy.validate()?;

        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };
        let direction = objective.direction();
        let target = config.target_fitness.map(|t| direction.normalize(t));
        let start = Instant::now();

        info!(
            strategy = strategy.name(),
            max_generations = config.max_generations,
            max_evaluations = ?config.max_evaluations,
            seed = ?config.seed,
            "search started"
        );

        strategy.state_mut().set_parallel(config.parallel);
        strategy.initialize(objective, &mut rng);

        let mut best_fitness = best_fitness_of(strategy);
        let mut fitness_history = Vec::with_capacity(config.max_generations + 1);
        fitness_history.push(direction.denormalize(best_fitness));
        let mut stagnation_counter = 0usize;

        let stop_reason = loop {
            if let Some(ref flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    break StopReason::Cancelled;
                }
            }
            if target.is_some_and(|t| best_fitness >= t) {
                break StopReason::TargetReached;
            }
            if config.patience > 0 && stagnation_counter >= config.patience {
                break StopReason::Stagnation;
            }

            let state = strategy.state();
            let elapsed_ms = start.elapsed().as_millis() as u64;
            if state.generation() >= config.max_generations {
                break StopReason::MaxGenerations;
            }
            if config
                .max_evaluations
                .is_some_and(|max| state.evaluations() >= max)
            {
                break StopReason::MaxEvaluations;
            }
            if config.time_limit_ms.is_some_and(|max| elapsed_ms >= max) {
                break StopReason::TimeLimit;
            }

            // progress after the generation about to run
            let progress =
                config.progress(state.generation() + 1, state.evaluations(), elapsed_ms);
            let outcome = strategy.step(objective, progress, &mut rng);
            let fitness = outcome.best.fitness();
            let population = outcome.population.len();

            if fitness > best_fitness {
                best_fitness = fitness;
                stagnation_counter = 0;
            } else {
                stagnation_counter += 1;
            }
            fitness_history.push(direction.denormalize(best_fitness));

            trace!(
                generation = strategy.state().generation(),
                best = direction.denormalize(best_fitness),
                evaluations = strategy.state().evaluations(),
                population,
                progress,
                "generation finished"
            );
        };

        let state = strategy.state();
        let best = state
            .best()
            .cloned()
            .expect("initialized strategy has a best individual");
        let result = SearchResult {
            best_objective: direction.denormalize(best.fitness()),
            best,
            generations: state.generation(),
            evaluations: state.evaluations(),
            stop_reason,
            fitness_history,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            strategy = strategy.name(),
            generations = result.generations,
            evaluations = result.evaluations,
            best = result.best_objective,
            reason = ?result.stop_reason,
            "search finished"
        );
        Ok(result)
    }
}

fn best_fitness_of<G: Genotype, S: SearchStrategy<G> + ?Sized>(strategy: &S) -> f64 {
    strategy
        .state()
        .best()
        .map_or(f64::NEG_INFINITY, Individual::fitness)
}
