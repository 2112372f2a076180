use super::config::CroConfig;
use super::dynamic::{DynamicConfig, OperatorTracker};
use crate::core::{
    Genotype, Individual, Initializer, Objective, Operator, OperatorContext, ParamScheduler, Params,
    Schedulable,
};
use crate::error::{ConfigError, EvoResult};
use crate::random::{uniform_choices, weighted_choices};
use crate::selection::{Reef, REEF_FLOOR};
use crate::strategy::{apply_operator, check_parents, SearchState, SearchStrategy};
use rand::RngCore;

/// How reef slots are assigned to operators.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SubstrateMode {
    /// Slot `i` always uses operator `i mod N` (CRO-SL).
    Fixed,
    /// Each generation every slot draws an operator uniformly (PCRO-SL).
    Uniform,
    /// Each generation every slot draws an operator from adaptive weights
    /// (DPCRO-SL).
    Dynamic(DynamicConfig),
}

/// Coral Reef Optimization with Substrate Layers.
///
/// The population is a reef of fixed capacity. Every generation each coral
/// is perturbed by the operator assigned to its slot, the resulting larvae
/// try to settle, and the weakest corals are depredated.
///
/// # Examples
///
/// ```
/// use u_evosearch::core::{Direction, FnOperator, Individual, Initializer, Objective, Operator, Params};
/// use u_evosearch::cro::{CroConfig, CroSl};
/// use u_evosearch::random::create_rng;
/// use u_evosearch::strategy::SearchStrategy;
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
///
/// let mut cro = CroSl::new(Init(20), pool, CroConfig::default()).unwrap();
/// let mut rng = create_rng(42);
/// cro.initialize(&Abs, &mut rng);
/// for g in 0..50 {
///     cro.step(&Abs, g as f64 / 50.0, &mut rng);
/// }
/// assert!(cro.state().best().unwrap().fitness() > -0.5);
/// ```
///
/// # References
///
/// - Salcedo-Sanz et al. (2017), "A coral reefs optimization algorithm with
///   substrate layers for optimal design of multi-layered solar panels"
/// - Pérez-Aracil et al. (2023), "New Probabilistic, Dynamic Multi-Method
///   Ensembles for Optimization Based on the CRO-SL"
pub struct CroSl<G> {
    name: String,
    state: SearchState<G>,
    initializer: Box<dyn Initializer<G>>,
    operators: Vec<Box<dyn Operator<G>>>,
    config: CroConfig,
    capacity: usize,
    mode: SubstrateMode,
    assignment: Vec<usize>,
    tracker: Option<OperatorTracker>,
    /// Operator of each larva of the current generation.
    larva_ops: Vec<usize>,
    scheduler: Option<ParamScheduler>,
}

impl<G: Genotype> CroSl<G> {
    /// CRO-SL: fixed round-robin substrates.
    pub fn new(
        initializer: impl Initializer<G> + 'static,
        operators: Vec<Box<dyn Operator<G>>>,
        config: CroConfig,
    ) -> EvoResult<Self> {
        Self::with_mode(initializer, operators, config, SubstrateMode::Fixed)
    }

    /// PCRO-SL: substrates redrawn uniformly every generation.
    pub fn probabilistic(
        initializer: impl Initializer<G> + 'static,
        operators: Vec<Box<dyn Operator<G>>>,
        config: CroConfig,
    ) -> EvoResult<Self> {
        Self::with_mode(initializer, operators, config, SubstrateMode::Uniform)
    }

    /// DPCRO-SL: substrates redrawn from adaptive operator weights.
    pub fn dynamic(
        initializer: impl Initializer<G> + 'static,
        operators: Vec<Box<dyn Operator<G>>>,
        config: CroConfig,
        dynamic: DynamicConfig,
    ) -> EvoResult<Self> {
        Self::with_mode(initializer, operators, config, SubstrateMode::Dynamic(dynamic))
    }

    /// Builds any member of the family.
    ///
    /// # Errors
    /// - [`ConfigError::EmptyOperatorPool`] without operators
    /// - [`ConfigError::InvalidParameter`] for an invalid configuration
    /// - [`ConfigError::PopulationTooSmall`] if the reef would hold fewer
    ///   than two corals
    pub fn with_mode(
        initializer: impl Initializer<G> + 'static,
        operators: Vec<Box<dyn Operator<G>>>,
        config: CroConfig,
        mode: SubstrateMode,
    ) -> EvoResult<Self> {
        if operators.is_empty() {
            return Err(ConfigError::EmptyOperatorPool);
        }
        config.validate()?;

        let (name, tracker) = match mode {
            SubstrateMode::Fixed => ("CRO-SL", None),
            SubstrateMode::Uniform => ("PCRO-SL", None),
            SubstrateMode::Dynamic(dynamic) => {
                dynamic.validate()?;
                ("DPCRO-SL", Some(OperatorTracker::new(dynamic, operators.len())))
            }
        };

        let capacity = config.capacity(initializer.pop_size());
        if capacity < REEF_FLOOR {
            return Err(ConfigError::PopulationTooSmall {
                size: capacity,
                min: REEF_FLOOR,
            });
        }

        let mut initializer: Box<dyn Initializer<G>> = Box::new(initializer);
        initializer.set_pop_size(capacity);
        let assignment = (0..capacity).map(|i| i % operators.len()).collect();

        Ok(Self {
            name: name.to_string(),
            state: SearchState::new(),
            initializer,
            operators,
            config,
            capacity,
            mode,
            assignment,
            tracker,
            larva_ops: Vec::new(),
            scheduler: None,
        })
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Drives `Fd`, `Pd` and `attempts` from a schedule.
    pub fn with_scheduler(mut self, scheduler: ParamScheduler) -> Self {
        self.apply(scheduler.get_params());
        self.scheduler = Some(scheduler);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn config(&self) -> &CroConfig {
        &self.config
    }

    pub fn mode(&self) -> SubstrateMode {
        self.mode
    }

    /// Operator index of every reef slot.
    ///
    /// Round robin until [`initialize`](SearchStrategy::initialize). PCRO-SL
    /// and DPCRO-SL then redraw it at initialization and before every
    /// generation; CRO-SL keeps the round robin.
    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    pub fn operators(&self) -> &[Box<dyn Operator<G>>] {
        &self.operators
    }

    /// Adaptive record, DPCRO-SL only.
    pub fn tracker(&self) -> Option<&OperatorTracker> {
        self.tracker.as_ref()
    }

    /// Probability of each operator being assigned to a slot.
    pub fn operator_weights(&self) -> Vec<f64> {
        let n = self.operators.len();
        match (&self.mode, &self.tracker) {
            (SubstrateMode::Dynamic(_), Some(tracker)) => tracker.weights().to_vec(),
            (SubstrateMode::Fixed, _) => {
                let mut counts = vec![0.0; n];
                for &op in &self.assignment {
                    counts[op] += 1.0;
                }
                counts.iter().map(|c| c / self.capacity as f64).collect()
            }
            _ => vec![1.0 / n as f64; n],
        }
    }

    fn redraw_assignment(&mut self, rng: &mut dyn RngCore) {
        match self.mode {
            SubstrateMode::Fixed => {}
            SubstrateMode::Uniform => {
                self.assignment = uniform_choices(self.operators.len(), self.capacity, rng);
            }
            SubstrateMode::Dynamic(_) => {
                if let Some(tracker) = &self.tracker {
                    self.assignment = weighted_choices(tracker.weights(), self.capacity, rng);
                }
            }
        }
    }

    fn apply(&mut self, params: &Params) {
        self.config.fd = params.get_or("Fd", self.config.fd).clamp(0.0, 1.0);
        self.config.pd = params.get_or("Pd", self.config.pd).clamp(0.0, 1.0);
        self.config.attempts = params
            .get_or("attempts", self.config.attempts as f64)
            .max(1.0)
            .round() as usize;
    }
}

impl<G: Genotype> SearchStrategy<G> for CroSl<G> {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &SearchState<G> {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SearchState<G> {
        &mut self.state
    }

    fn initializer(&self) -> &dyn Initializer<G> {
        self.initializer.as_ref()
    }

    /// Generates a full reef.
    fn initialize(&mut self, objective: &dyn Objective<G>, rng: &mut dyn RngCore) {
        self.initializer.set_pop_size(self.capacity);
        let mut reef = self.initializer.generate_population(self.capacity, rng);
        self.state.evaluate(&mut reef, objective);
        self.state.reset(reef);
        if let SubstrateMode::Dynamic(dynamic) = self.mode {
            self.tracker = Some(OperatorTracker::new(dynamic, self.operators.len()));
        }
        self.redraw_assignment(rng);
    }

    fn perturb(
        &mut self,
        parents: &[Individual<G>],
        objective: &dyn Objective<G>,
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        check_parents(parents, &self.name);
        self.redraw_assignment(rng);

        let capacity = self.capacity;
        let larva_ops: Vec<usize> = (0..parents.len())
            .map(|slot| self.assignment[slot % capacity])
            .collect();

        let mut larvae = {
            let best = self.state.best().unwrap_or(&parents[0]);
            let ctx = OperatorContext {
                population: parents,
                objective,
                global_best: best,
                initializer: self.initializer.as_ref(),
            };
            parents
                .iter()
                .zip(&larva_ops)
                .map(|(coral, &op)| apply_operator(self.operators[op].as_ref(), coral, &ctx, rng))
                .collect::<Vec<_>>()
        };
        self.state.evaluate(&mut larvae, objective);

        if let Some(tracker) = self.tracker.as_mut() {
            for (larva, &op) in larvae.iter().zip(&larva_ops) {
                tracker.record_larva(op, larva.fitness());
            }
        }
        self.larva_ops = larva_ops;
        larvae
    }

    fn select_individuals(
        &mut self,
        population: Vec<Individual<G>>,
        offspring: Vec<Individual<G>>,
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        let mut reef = Reef::from_population(population, self.capacity);
        let settled = reef.settle_all(offspring, self.config.attempts, rng);

        if let Some(tracker) = self.tracker.as_mut() {
            for (&ok, &op) in settled.iter().zip(&self.larva_ops) {
                if ok {
                    tracker.record_settled(op);
                }
            }
        }

        reef.depredate(self.config.fd, self.config.pd, rng);
        reef.into_corals()
    }

    fn update_params(&mut self, progress: f64) {
        self.initializer.set_pop_size(self.state.population().len());

        for op in &mut self.operators {
            op.step(progress);
        }

        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.step(progress);
            self.apply(scheduler.get_params());
            self.scheduler = Some(scheduler);
        }

        if let Some(tracker) = self.tracker.as_mut() {
            tracker.update(progress);
        }
    }

    fn extra(&self) -> Params {
        let mut extra = Params::new()
            .with("capacity", self.capacity as f64)
            .with("Fd", self.config.fd)
            .with("Pd", self.config.pd)
            .with("attempts", self.config.attempts as f64);
        for (i, w) in self.operator_weights().into_iter().enumerate() {
            extra.insert(&format!("weight[{i}]"), w);
        }
        extra
    }
}
