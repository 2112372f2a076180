//! Runner configuration.
//!
//! [`SearchConfig`] holds the budgets and stopping rules of a run.

use crate::error::{ConfigError, EvoResult};

/// Which budget search progress is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProgressMetric {
    /// The largest fraction consumed over all configured budgets.
    #[default]
    Max,
    /// Completed generations over `max_generations`.
    Generations,
    /// Objective calls over `max_evaluations`.
    Evaluations,
    /// Elapsed time over `time_limit_ms`.
    Time,
}

/// Configuration for [`SearchRunner`](super::SearchRunner).
///
/// The run stops at the first of: generation budget, evaluation budget,
/// time limit, target reached, `patience` generations without strict
/// improvement, or external cancellation.
///
/// # Defaults
///
/// ```
/// use u_evosearch::runner::SearchConfig;
///
/// let config = SearchConfig::default();
/// assert_eq!(config.max_generations, 100);
/// assert_eq!(config.patience, 0);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_evosearch::runner::{ProgressMetric, SearchConfig};
///
/// let config = SearchConfig::default()
///     .with_max_generations(500)
///     .with_max_evaluations(20_000)
///     .with_progress_metric(ProgressMetric::Evaluations)
///     .with_target_fitness(1e-6)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchConfig {
    /// Maximum number of generations.
    pub max_generations: usize,

    /// Maximum number of objective calls (`None` = unlimited).
    ///
    /// Checked between generations, so the last generation may overshoot.
    pub max_evaluations: Option<usize>,

    /// Wall-clock limit in milliseconds (`None` = unlimited).
    pub time_limit_ms: Option<u64>,

    /// Raw objective value at which the run stops early, in the objective's
    /// direction (`<=` when minimizing, `>=` when maximizing).
    pub target_fitness: Option<f64>,

    /// Stop after this many generations without a strict improvement of
    /// the best individual (0 = disabled).
    pub patience: usize,

    /// Budget used to compute progress.
    pub progress_metric: ProgressMetric,

    /// Evaluate offspring on the rayon thread pool (needs the `parallel`
    /// feature).
    pub parallel: bool,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_generations: 100,
            max_evaluations: None,
            time_limit_ms: None,
            target_fitness: None,
            patience: 0,
            progress_metric: ProgressMetric::Max,
            parallel: false,
            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn with_max_generations(mut self, n: usize) -> Self {
        self.max_generations = n;
        self
    }

    pub fn with_max_evaluations(mut self, n: usize) -> Self {
        self.max_evaluations = Some(n);
        self
    }

    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = Some(ms);
        self
    }

    pub fn with_target_fitness(mut self, target: f64) -> Self {
        self.target_fitness = Some(target);
        self
    }

    pub fn with_patience(mut self, generations: usize) -> Self {
        self.patience = generations;
        self
    }

    pub fn with_progress_metric(mut self, metric: ProgressMetric) -> Self {
        self.progress_metric = metric;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EvoResult<()> {
        if self.max_generations == 0 {
            return Err(ConfigError::invalid("max_generations", "must be positive"));
        }
        if self.max_evaluations == Some(0) {
            return Err(ConfigError::invalid("max_evaluations", "must be positive"));
        }
        if self.time_limit_ms == Some(0) {
            return Err(ConfigError::invalid("time_limit_ms", "must be positive"));
        }
        if self.target_fitness.is_some_and(f64::is_nan) {
            return Err(ConfigError::invalid("target_fitness", "must not be NaN"));
        }
        match self.progress_metric {
            ProgressMetric::Evaluations if self.max_evaluations.is_none() => Err(ConfigError::invalid(
                "progress_metric",
                "evaluation progress needs max_evaluations",
            )),
            ProgressMetric::Time if self.time_limit_ms.is_none() => Err(ConfigError::invalid(
                "progress_metric",
                "time progress needs time_limit_ms",
            )),
            _ => Ok(()),
        }
    }

    /// Fraction of the budget consumed, clamped to `[0, 1]`.
    pub fn progress(&self, generations: usize, evaluations: usize, elapsed_ms: u64) -> f64 {
        let by_generations = generations as f64 / self.max_generations as f64;
        let by_evaluations = self
            .max_evaluations
            .map(|max| evaluations as f64 / max as f64);
        let by_time = self.time_limit_ms.map(|max| elapsed_ms as f64 / max as f64);

        let progress = match self.progress_metric {
            ProgressMetric::Max => [Some(by_generations), by_evaluations, by_time]
                .into_iter()
                .flatten()
                .fold(0.0, f64::max),
            ProgressMetric::Generations => by_generations,
            ProgressMetric::Evaluations => by_evaluations.unwrap_or(by_generations),
            ProgressMetric::Time => by_time.unwrap_or(by_generations),
        };
        progress.clamp(0.0, 1.0)
    }
}
