//! Adaptive operator probabilities for DPCRO-SL.
//!
//! Offspring outcomes are buffered per operator. Each time search progress
//! crosses a window boundary (`progress > windows_elapsed / steps`) the
//! buffers collapse into one metric per operator, and every generation the
//! metric vector is turned into selection probabilities by a
//! temperature-controlled softmax ([`operator_probability`]).
//!
//! # References
//!
//! - Pérez-Aracil et al. (2023), "New Probabilistic, Dynamic Multi-Method
//!   Ensembles for Optimization Based on the CRO-SL", *Mathematics* 11(7)

use crate::error::{ConfigError, EvoResult};
use std::str::FromStr;

/// What an operator is rewarded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DynMethod {
    /// The metric of its offspring fitness.
    Fitness,
    /// Its offspring metric minus the previous window's pooled metric.
    #[default]
    Diff,
    /// The fraction of its larvae that settled.
    Success,
}

/// How a window's fitness buffer collapses into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DynMetric {
    #[default]
    Best,
    Avg,
    Med,
    Worse,
}

impl FromStr for DynMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fitness" => Ok(Self::Fitness),
            "diff" => Ok(Self::Diff),
            "success" => Ok(Self::Success),
            _ => Err(ConfigError::UnknownMethod {
                kind: "dynamic",
                name: s.to_string(),
            }),
        }
    }
}

impl FromStr for DynMetric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "best" => Ok(Self::Best),
            "avg" => Ok(Self::Avg),
            "med" => Ok(Self::Med),
            "worse" | "worst" => Ok(Self::Worse),
            _ => Err(ConfigError::UnknownMethod {
                kind: "dynamic metric",
                name: s.to_string(),
            }),
        }
    }
}

/// DPCRO-SL adaptation settings.
///
/// # Examples
///
/// ```
/// use u_evosearch::cro::{DynMethod, DynMetric, DynamicConfig};
///
/// let config = DynamicConfig::default()
///     .with_method("success".parse().unwrap())
///     .with_metric(DynMetric::Avg)
///     .with_steps(50)
///     .with_prob_amp(0.05);
/// assert_eq!(config.method, DynMethod::Success);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DynamicConfig {
    pub method: DynMethod,

    /// Ignored by [`DynMethod::Success`].
    pub metric: DynMetric,

    /// Number of evaluation windows over the whole run.
    pub steps: usize,

    /// Softmax temperature. Smaller values sharpen the distribution toward
    /// the best operator, larger ones flatten it toward uniform.
    pub prob_amp: f64,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            method: DynMethod::Diff,
            metric: DynMetric::Best,
            steps: 75,
            prob_amp: 0.1,
        }
    }
}

impl DynamicConfig {
    pub fn with_method(mut self, method: DynMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_metric(mut self, metric: DynMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_prob_amp(mut self, prob_amp: f64) -> Self {
        self.prob_amp = prob_amp;
        self
    }

    pub fn validate(&self) -> EvoResult<()> {
        if self.steps == 0 {
            return Err(ConfigError::invalid("dyn_steps", "must be at least 1"));
        }
        if !(self.prob_amp > 0.0 && self.prob_amp.is_finite()) {
            return Err(ConfigError::invalid(
                "prob_amp",
                format!("must be positive, got {}", self.prob_amp),
            ));
        }
        Ok(())
    }
}

/// Collapses a window's fitness values. An empty buffer scores 0.
pub fn operator_metric(data: &[f64], metric: DynMetric) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    match metric {
        DynMetric::Best => data.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        DynMetric::Worse => data.iter().copied().fold(f64::INFINITY, f64::min),
        DynMetric::Avg => data.iter().sum::<f64>() / data.len() as f64,
        DynMetric::Med => {
            let mut sorted = data.to_vec();
            sorted.sort_by(f64::total_cmp);
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            } else {
                sorted[mid]
            }
        }
    }
}

/// Converts per-operator metrics into selection probabilities.
///
/// The metric vector is L1-normalized, exponentiated and raised to
/// `1 / prob_amp`. If amplification underflows or overflows, the plain
/// softmax is used instead. Every entry ends up at least `0.02 / N` and the
/// result sums to 1. Non-finite metrics count as 0.
///
/// # Examples
///
/// ```
/// use u_evosearch::cro::operator_probability;
///
/// let p = operator_probability(&[0.0, 0.0, 0.0], 0.1);
/// assert!(p.iter().all(|&x| (x - 1.0 / 3.0).abs() < 1e-12));
///
/// let p = operator_probability(&[10.0, 0.0], 0.05);
/// assert!(p[0] > p[1] && p[1] > 0.0099);
/// ```
pub fn operator_probability(values: &[f64], prob_amp: f64) -> Vec<f64> {
    amplified_softmax(values, prob_amp).0
}

/// Returns the probabilities and whether amplification had to be dropped.
fn amplified_softmax(values: &[f64], prob_amp: f64) -> (Vec<f64>, bool) {
    let n = values.len();
    if n == 0 {
        return (Vec::new(), false);
    }

    let values: Vec<f64> = values
        .iter()
        .map(|&v| if v.is_finite() { v } else { 0.0 })
        .collect();
    let norm: f64 = values.iter().map(|v| v.abs()).sum();
    let norm = if norm != 0.0 { norm } else { 1e-5 };

    let exp: Vec<f64> = values.iter().map(|v| (v / norm).exp()).collect();
    let amplified: Vec<f64> = exp.iter().map(|e| e.powf(1.0 / prob_amp)).collect();

    let fallback = amplified.iter().any(|&a| a == 0.0 || !a.is_finite());
    let mut prob = if fallback {
        let total: f64 = exp.iter().sum();
        exp.iter().map(|e| e / total).collect::<Vec<_>>()
    } else {
        let total: f64 = amplified.iter().sum();
        if total.is_finite() {
            amplified.iter().map(|a| a / total).collect()
        } else {
            let total: f64 = exp.iter().sum();
            exp.iter().map(|e| e / total).collect()
        }
    };

    // shift chosen so the renormalized minimum is exactly `floor`
    let floor = 0.02 / n as f64;
    if prob.iter().any(|&p| p <= floor) {
        let shift = floor / (1.0 - n as f64 * floor);
        for p in prob.iter_mut() {
            *p += shift;
        }
        let total: f64 = prob.iter().sum();
        for p in prob.iter_mut() {
            *p /= total;
        }
    }
    (prob, fallback)
}

/// Per-operator performance record and adaptive weights.
#[derive(Debug, Clone)]
pub struct OperatorTracker {
    config: DynamicConfig,
    buffers: Vec<Vec<f64>>,
    successes: Vec<usize>,
    larvae: Vec<usize>,
    metric: Vec<f64>,
    weights: Vec<f64>,
    previous_pooled: f64,
    windows_elapsed: usize,
    warned: bool,
    weight_history: Vec<Vec<f64>>,
    metric_history: Vec<Vec<f64>>,
}

impl OperatorTracker {
    /// Starts with uniform weights over `n_operators`.
    pub fn new(config: DynamicConfig, n_operators: usize) -> Self {
        let uniform = if n_operators == 0 {
            Vec::new()
        } else {
            vec![1.0 / n_operators as f64; n_operators]
        };
        Self {
            config,
            buffers: vec![Vec::new(); n_operators],
            successes: vec![0; n_operators],
            larvae: vec![0; n_operators],
            metric: vec![0.0; n_operators],
            weights: uniform,
            previous_pooled: 0.0,
            windows_elapsed: 0,
            warned: false,
            weight_history: Vec::new(),
            metric_history: Vec::new(),
        }
    }

    pub fn config(&self) -> &DynamicConfig {
        &self.config
    }

    /// Current selection probabilities.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Metric of the last evaluated window.
    pub fn metric(&self) -> &[f64] {
        &self.metric
    }

    pub fn windows_elapsed(&self) -> usize {
        self.windows_elapsed
    }

    /// Weights after every update, oldest first.
    pub fn weight_history(&self) -> &[Vec<f64>] {
        &self.weight_history
    }

    /// Metric vector after every update, oldest first.
    pub fn metric_history(&self) -> &[Vec<f64>] {
        &self.metric_history
    }

    /// Whether amplification has overflowed at least once and the weights
    /// fell back to a plain softmax. The warning is logged only then.
    pub fn fallback_warned(&self) -> bool {
        self.warned
    }

    /// Records an evaluated larva produced by operator `op`.
    pub fn record_larva(&mut self, op: usize, fitness: f64) {
        match self.config.method {
            DynMethod::Fitness | DynMethod::Diff => self.buffers[op].push(fitness),
            DynMethod::Success => self.larvae[op] += 1,
        }
    }

    /// Records that a larva produced by operator `op` settled in the reef.
    pub fn record_settled(&mut self, op: usize) {
        if self.config.method == DynMethod::Success {
            self.successes[op] += 1;
        }
    }

    /// Evaluates the window if `progress` crossed a boundary, then
    /// recomputes the weights.
    pub fn update(&mut self, progress: f64) -> &[f64] {
        let boundary = self.windows_elapsed as f64 / self.config.steps as f64;
        if progress > boundary {
            self.windows_elapsed += 1;
            self.evaluate_window();
            tracing::debug!(
                window = self.windows_elapsed,
                metric = ?self.metric,
                "operator window evaluated"
            );
        }

        let (weights, fallback) = amplified_softmax(&self.metric, self.config.prob_amp);
        if fallback && !self.warned {
            self.warned = true;
            tracing::warn!(
                prob_amp = self.config.prob_amp,
                "probability amplification is numerically unstable, using plain softmax"
            );
        }
        self.weights = weights;
        self.weight_history.push(self.weights.clone());
        self.metric_history.push(self.metric.clone());
        &self.weights
    }

    fn evaluate_window(&mut self) {
        let metric_fn = self.config.metric;
        match self.config.method {
            DynMethod::Fitness => {
                for (m, buffer) in self.metric.iter_mut().zip(&self.buffers) {
                    *m = operator_metric(buffer, metric_fn);
                }
            }
            DynMethod::Diff => {
                let pooled_data: Vec<f64> = self.buffers.iter().flatten().copied().collect();
                let pooled = operator_metric(&pooled_data, metric_fn);
                for (m, buffer) in self.metric.iter_mut().zip(&self.buffers) {
                    *m = operator_metric(buffer, metric_fn) - self.previous_pooled;
                }
                self.previous_pooled = pooled;
            }
            DynMethod::Success => {
                for (i, m) in self.metric.iter_mut().enumerate() {
                    *m = if self.larvae[i] > 0 {
                        self.successes[i] as f64 / self.larvae[i] as f64
                    } else {
                        0.0
                    };
                }
            }
        }

        for buffer in &mut self.buffers {
            buffer.clear();
        }
        self.successes.iter_mut().for_each(|s| *s = 0);
        self.larvae.iter_mut().for_each(|l| *l = 0);
    }
}
