//! Progress-driven parameter schedules.
//!
//! A [`ParamScheduler`] maps search progress (a fraction in `[0, 1]`) to a
//! set of named parameters. Components that own one are
//! [`Schedulable`]: the strategy steps them once per generation.
//!
//! # Examples
//!
//! ```
//! use u_evosearch::core::{ParamScheduler, ParamValue, Schedulable, ScheduleMethod};
//!
//! let mut sched = ParamScheduler::new(ScheduleMethod::Linear)
//!     .with_param("F", ParamValue::Range(0.01, 0.00001))
//!     .with_param("amount", ParamValue::Fixed(20.0));
//!
//! sched.step(0.5);
//! let f = sched.get_params().get("F").unwrap();
//! assert!((f - 0.005005).abs() < 1e-12);
//! ```

use crate::error::{ConfigError, EvoResult};
use std::collections::BTreeMap;

/// Capability of components whose behaviour changes with search progress.
///
/// The default implementation does nothing, so components without a
/// schedule opt in with an empty `impl`.
pub trait Schedulable {
    /// Advances internal parameters to `progress` in `[0, 1]`.
    fn step(&mut self, _progress: f64) {}
}

impl<T: Schedulable + ?Sized> Schedulable for Box<T> {
    fn step(&mut self, progress: f64) {
        (**self).step(progress);
    }
}

/// Named parameter values produced by a schedule.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Params(BTreeMap<String, f64>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: f64) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn get_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).unwrap_or(default)
    }

    /// Returns the value of a required key.
    pub fn require(&self, key: &str) -> EvoResult<f64> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingParameter(key.to_string()))
    }

    /// Returns a required key as a non-negative count.
    pub fn require_count(&self, key: &str) -> EvoResult<usize> {
        let v = self.require(key)?;
        if !(v >= 0.0 && v.is_finite()) {
            return Err(ConfigError::invalid(
                key,
                format!("must be a non-negative count, got {v}"),
            ));
        }
        Ok(v.round() as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How a ranged parameter moves between its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScheduleMethod {
    /// `start + (end - start) * progress`
    #[default]
    Linear,
    /// `start * (end / start) ^ progress`
    ///
    /// Falls back to linear when the endpoints differ in sign or one is 0.
    Exponential,
}

impl ScheduleMethod {
    fn interpolate(self, start: f64, end: f64, progress: f64) -> f64 {
        match self {
            ScheduleMethod::Linear => start + (end - start) * progress,
            ScheduleMethod::Exponential => {
                if start * end > 0.0 {
                    start * (end / start).powf(progress)
                } else {
                    start + (end - start) * progress
                }
            }
        }
    }
}

/// How one scheduled parameter moves with progress.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamValue {
    /// Constant throughout the run.
    Fixed(f64),
    /// Moves from the first value at progress 0 to the second at progress 1.
    Range(f64, f64),
}

/// Produces a parameter mapping that varies with search progress.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamScheduler {
    method: ScheduleMethod,
    schedule: BTreeMap<String, ParamValue>,
    current: Params,
    progress: f64,
}

impl ParamScheduler {
    pub fn new(method: ScheduleMethod) -> Self {
        Self {
            method,
            schedule: BTreeMap::new(),
            current: Params::new(),
            progress: 0.0,
        }
    }

    /// Adds (or replaces) a scheduled parameter.
    pub fn with_param(mut self, key: &str, value: ParamValue) -> Self {
        self.schedule.insert(key.to_string(), value);
        self.current
            .insert(key, Self::value_at(self.method, value, self.progress));
        self
    }

    pub fn method(&self) -> ScheduleMethod {
        self.method
    }

    /// Progress the scheduler was last stepped to.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Parameters at the current progress.
    pub fn get_params(&self) -> &Params {
        &self.current
    }

    fn value_at(method: ScheduleMethod, value: ParamValue, progress: f64) -> f64 {
        match value {
            ParamValue::Fixed(v) => v,
            ParamValue::Range(start, end) => method.interpolate(start, end, progress),
        }
    }
}

impl Schedulable for ParamScheduler {
    fn step(&mut self, progress: f64) {
        self.progress = progress.clamp(0.0, 1.0);
        for (key, &value) in &self.schedule {
            self.current
                .insert(key, Self::value_at(self.method, value, self.progress));
        }
    }
}
