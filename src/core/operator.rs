//! Perturbation operators.
//!
//! An [`Operator`] turns one individual into a new one, optionally looking
//! at the rest of the population, the global best and the initializer (DE
//! variants, crossover, random restarts). Leaf operators are supplied by the
//! user; this module provides the call contract and composition glue.

use super::individual::Individual;
use super::schedule::{ParamScheduler, Params, Schedulable};
use super::types::{Initializer, Objective};
use rand::{Rng, RngCore};

/// Read-only view of the search state handed to an operator.
pub struct OperatorContext<'a, G> {
    /// The parent list the individual belongs to.
    pub population: &'a [Individual<G>],
    /// The objective being optimized.
    pub objective: &'a dyn Objective<G>,
    /// Best individual found so far.
    pub global_best: &'a Individual<G>,
    /// The strategy's initializer (for operators that sample fresh genotypes).
    pub initializer: &'a dyn Initializer<G>,
}

/// A perturbation operator.
///
/// `evolve` must not mutate anything shared: it returns a new individual.
/// The caller repairs and evaluates it afterwards.
///
/// Operators are [`Schedulable`]; those with progress-dependent parameters
/// update them in `step`.
pub trait Operator<G>: Schedulable + Send + Sync {
    /// Human-readable name, used in logs and weight reports.
    fn name(&self) -> &str;

    /// Produces a new individual from `individual`.
    fn evolve(
        &self,
        individual: &Individual<G>,
        ctx: &OperatorContext<'_, G>,
        rng: &mut dyn RngCore,
    ) -> Individual<G>;
}

impl<G, T: Operator<G> + ?Sized> Operator<G> for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn evolve(
        &self,
        individual: &Individual<G>,
        ctx: &OperatorContext<'_, G>,
        rng: &mut dyn RngCore,
    ) -> Individual<G> {
        (**self).evolve(individual, ctx, rng)
    }
}

/// Returns an unevaluated copy of the individual.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOperator;

impl Schedulable for NullOperator {}

impl<G: Clone> Operator<G> for NullOperator {
    fn name(&self) -> &str {
        "Nothing"
    }

    fn evolve(
        &self,
        individual: &Individual<G>,
        _ctx: &OperatorContext<'_, G>,
        _rng: &mut dyn RngCore,
    ) -> Individual<G> {
        let mut copy = Individual::new(individual.genotype().clone());
        copy.set_velocity(individual.velocity().cloned());
        copy
    }
}

/// Applies `first`, then `second` to the result.
#[derive(Debug, Clone)]
pub struct Chain<A, B> {
    first: A,
    second: B,
    name: String,
}

impl<A, B> Chain<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            name: "Sequence".to_string(),
        }
    }
}

impl<A: Schedulable, B: Schedulable> Schedulable for Chain<A, B> {
    fn step(&mut self, progress: f64) {
        self.first.step(progress);
        self.second.step(progress);
    }
}

impl<G, A: Operator<G>, B: Operator<G>> Operator<G> for Chain<A, B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn evolve(
        &self,
        individual: &Individual<G>,
        ctx: &OperatorContext<'_, G>,
        rng: &mut dyn RngCore,
    ) -> Individual<G> {
        let intermediate = self.first.evolve(individual, ctx, rng);
        self.second.evolve(&intermediate, ctx, rng)
    }
}

/// Applies `primary` with probability `p`, otherwise `fallback`.
#[derive(Debug, Clone)]
pub struct Branch<A, B> {
    primary: A,
    fallback: B,
    p: f64,
    name: String,
}

impl<A, B> Branch<A, B> {
    /// `p` is clamped to `[0, 1]`.
    pub fn new(primary: A, fallback: B, p: f64) -> Self {
        Self {
            primary,
            fallback,
            p: p.clamp(0.0, 1.0),
            name: "Branch".to_string(),
        }
    }

    pub fn probability(&self) -> f64 {
        self.p
    }
}

impl<A: Schedulable, B: Schedulable> Schedulable for Branch<A, B> {
    fn step(&mut self, progress: f64) {
        self.primary.step(progress);
        self.fallback.step(progress);
    }
}

impl<G, A: Operator<G>, B: Operator<G>> Operator<G> for Branch<A, B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn evolve(
        &self,
        individual: &Individual<G>,
        ctx: &OperatorContext<'_, G>,
        rng: &mut dyn RngCore,
    ) -> Individual<G> {
        if rng.random_bool(self.p) {
            self.primary.evolve(individual, ctx, rng)
        } else {
            self.fallback.evolve(individual, ctx, rng)
        }
    }
}

/// Adapts a closure into an [`Operator`].
///
/// The closure receives the current parameters: fixed ones, or those of an
/// attached [`ParamScheduler`], which is stepped along with the search.
///
/// # Examples
///
/// ```
/// use u_evosearch::core::{FnOperator, Individual, Params};
/// use rand::Rng;
///
/// let shift = FnOperator::new(
///     "Shift",
///     Params::new().with("F", 0.1),
///     |ind: &Individual<f64>, _ctx, params: &Params, rng| {
///         let f = params.get_or("F", 1.0);
///         Individual::new(ind.genotype() + rng.random_range(-f..f))
///     },
/// );
/// # let _ = shift;
/// ```
pub struct FnOperator<F> {
    name: String,
    params: Params,
    scheduler: Option<ParamScheduler>,
    f: F,
}

impl<F> FnOperator<F> {
    pub fn new<G>(name: &str, params: Params, f: F) -> Self
    where
        F: Fn(&Individual<G>, &OperatorContext<'_, G>, &Params, &mut dyn RngCore) -> Individual<G>,
    {
        Self {
            name: name.to_string(),
            params,
            scheduler: None,
            f,
        }
    }

    /// Drives the closure's parameters from a schedule.
    pub fn with_scheduler(mut self, scheduler: ParamScheduler) -> Self {
        self.params = scheduler.get_params().clone();
        self.scheduler = Some(scheduler);
        self
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl<F> Schedulable for FnOperator<F> {
    fn step(&mut self, progress: f64) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.step(progress);
            self.params = scheduler.get_params().clone();
        }
    }
}

impl<G, F> Operator<G> for FnOperator<F>
where
    F: Fn(&Individual<G>, &OperatorContext<'_, G>, &Params, &mut dyn RngCore) -> Individual<G>
        + Send
        + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evolve(
        &self,
        individual: &Individual<G>,
        ctx: &OperatorContext<'_, G>,
        rng: &mut dyn RngCore,
    ) -> Individual<G> {
        (self.f)(individual, ctx, &self.params, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Direction, ParamValue, ScheduleMethod};
    use crate::random::create_rng;

    struct Abs;

    impl Objective<f64> for Abs {
        fn direction(&self) -> Direction {
            Direction::Minimize
        }
        fn evaluate(&self, x: &f64) -> f64 {
            x.abs()
        }
        fn repair_solution(&self, x: f64) -> f64 {
            x
        }
    }

    struct Zeros;

    impl Initializer<f64> for Zeros {
        fn pop_size(&self) -> usize {
            1
        }
        fn set_pop_size(&mut self, _size: usize) {}
        fn generate_random(&self, _rng: &mut dyn RngCore) -> f64 {
            0.0
        }
    }

    type OpFn =
        fn(&Individual<f64>, &OperatorContext<'_, f64>, &Params, &mut dyn RngCore) -> Individual<f64>;

    fn shift(ind: &Individual<f64>, _ctx: &OperatorContext<'_, f64>, p: &Params, _rng: &mut dyn RngCore) -> Individual<f64> {
        Individual::new(ind.genotype() + p.get_or("x", 0.0))
    }

    fn add(amount: f64) -> FnOperator<OpFn> {
        FnOperator::new("Add", Params::new().with("x", amount), shift as OpFn)
    }

    fn with_ctx<T>(f: impl FnOnce(&OperatorContext<'_, f64>) -> T) -> T {
        let population = vec![Individual::new(1.0)];
        let best = Individual::new(0.0);
        let ctx = OperatorContext {
            population: &population,
            objective: &Abs,
            global_best: &best,
            initializer: &Zeros,
        };
        f(&ctx)
    }

    #[test]
    fn test_null_operator_copies_without_fitness() {
        let mut rng = create_rng(1);
        let mut parent = Individual::new(3.0);
        parent.set_fitness(-3.0);
        let child = with_ctx(|ctx| NullOperator.evolve(&parent, ctx, &mut rng));
        assert_eq!(*child.genotype(), 3.0);
        assert!(!child.is_evaluated());
    }

    #[test]
    fn test_chain_applies_in_order() {
        let mut rng = create_rng(1);
        let chain = Chain::new(add(1.0), add(10.0));
        let child = with_ctx(|ctx| chain.evolve(&Individual::new(0.0), ctx, &mut rng));
        assert_eq!(*child.genotype(), 11.0);
    }

    #[test]
    fn test_branch_extremes() {
        let mut rng = create_rng(1);
        let always = Branch::new(add(1.0), NullOperator, 1.0);
        let never = Branch::new(add(1.0), NullOperator, 0.0);
        for _ in 0..50 {
            let a = with_ctx(|ctx| always.evolve(&Individual::new(0.0), ctx, &mut rng));
            let b = with_ctx(|ctx| never.evolve(&Individual::new(0.0), ctx, &mut rng));
            assert_eq!(*a.genotype(), 1.0);
            assert_eq!(*b.genotype(), 0.0);
        }
    }

    #[test]
    fn test_branch_clamps_probability() {
        let b = Branch::new(NullOperator, NullOperator, 1.7);
        assert_eq!(b.probability(), 1.0);
    }

    #[test]
    fn test_fn_operator_follows_schedule() {
        let mut rng = create_rng(1);
        let mut op = add(0.0).with_scheduler(
            ParamScheduler::new(ScheduleMethod::Linear).with_param("x", ParamValue::Range(0.0, 2.0)),
        );
        op.step(0.5);
        assert_eq!(op.params().get("x"), Some(1.0));
        let child = with_ctx(|ctx| op.evolve(&Individual::new(0.0), ctx, &mut rng));
        assert_eq!(*child.genotype(), 1.0);
    }

    #[test]
    fn test_boxed_operators_in_one_pool() {
        let mut rng = create_rng(1);
        let pool: Vec<Box<dyn Operator<f64>>> = vec![Box::new(add(1.0)), Box::new(NullOperator)];
        let names: Vec<&str> = pool.iter().map(|op| op.name()).collect();
        assert_eq!(names, vec!["Add", "Nothing"]);
        let child = with_ctx(|ctx| pool[0].evolve(&Individual::new(1.0), ctx, &mut rng));
        assert_eq!(*child.genotype(), 2.0);
    }
}
