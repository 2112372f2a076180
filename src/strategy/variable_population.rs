use super::{apply_operator, check_parents, check_pop_size, SearchState, SearchStrategy};
use crate::core::{
    Genotype, Individual, Initializer, Objective, Operator, OperatorContext, ParamScheduler, Params,
    Schedulable,
};
use crate::error::{ConfigError, EvoResult};
use crate::selection::{ParentSelection, SurvivorSelection};
use rand::{Rng, RngCore};

/// Produces a configurable number of offspring, each from a parent drawn
/// uniformly from the parent list.
///
/// Survivor selection must cope with mismatched list lengths (elitism,
/// (μ+λ), (μ,λ), ...). `n_offspring` defaults to the initializer's
/// population size.
pub struct VariablePopulation<G> {
    name: String,
    state: SearchState<G>,
    initializer: Box<dyn Initializer<G>>,
    operator: Box<dyn Operator<G>>,
    n_offspring: usize,
    parent_selection: ParentSelection,
    survivor_selection: SurvivorSelection,
    scheduler: Option<ParamScheduler>,
}

impl<G: Genotype> VariablePopulation<G> {
    pub fn new(
        initializer: impl Initializer<G> + 'static,
        operator: impl Operator<G> + 'static,
    ) -> Self {
        let n_offspring = initializer.pop_size();
        Self {
            name: "Variable Population Evolution".to_string(),
            state: SearchState::new(),
            initializer: Box::new(initializer),
            operator: Box::new(operator),
            n_offspring,
            parent_selection: ParentSelection::default(),
            survivor_selection: SurvivorSelection::default(),
            scheduler: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Sets how many offspring each generation produces.
    ///
    /// # Errors
    /// `n_offspring` must be at least 1.
    pub fn with_offspring(mut self, n_offspring: usize) -> EvoResult<Self> {
        if n_offspring == 0 {
            return Err(ConfigError::invalid("n_offspring", "must be at least 1"));
        }
        self.n_offspring = n_offspring;
        Ok(self)
    }

    pub fn with_parent_selection(mut self, selection: ParentSelection) -> Self {
        self.parent_selection = selection;
        self
    }

    pub fn with_survivor_selection(mut self, selection: SurvivorSelection) -> Self {
        self.survivor_selection = selection;
        self
    }

    /// Attaches a strategy-level schedule, reported in snapshots.
    pub fn with_scheduler(mut self, scheduler: ParamScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn n_offspring(&self) -> usize {
        self.n_offspring
    }

    /// Swaps the operator used by later generations.
    pub(crate) fn set_operator(&mut self, operator: impl Operator<G> + 'static) {
        self.operator = Box::new(operator);
    }
}

impl<G: Genotype> SearchStrategy<G> for VariablePopulation<G> {
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

    fn validate(&self) -> EvoResult<()> {
        check_pop_size(self.initializer.as_ref())?;
        if self.n_offspring == 0 {
            return Err(ConfigError::invalid("n_offspring", "must be at least 1"));
        }
        self.parent_selection.validate()?;
        self.survivor_selection.validate()
    }

    fn select_parents(
        &mut self,
        population: &[Individual<G>],
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        self.parent_selection.select(population, rng)
    }

    fn perturb(
        &mut self,
        parents: &[Individual<G>],
        objective: &dyn Objective<G>,
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        check_parents(parents, &self.name);
        let mut offspring = {
            let best = self.state.best().unwrap_or(&parents[0]);
            let ctx = OperatorContext {
                population: parents,
                objective,
                global_best: best,
                initializer: self.initializer.as_ref(),
            };
            (0..self.n_offspring)
                .map(|_| {
                    let parent = &parents[rng.random_range(0..parents.len())];
                    apply_operator(self.operator.as_ref(), parent, &ctx, rng)
                })
                .collect::<Vec<_>>()
        };
        self.state.evaluate(&mut offspring, objective);
        offspring
    }

    fn select_individuals(
        &mut self,
        population: Vec<Individual<G>>,
        offspring: Vec<Individual<G>>,
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        self.survivor_selection.select(population, offspring, rng)
    }

    fn update_params(&mut self, progress: f64) {
        self.operator.step(progress);
        self.parent_selection.step(progress);
        self.survivor_selection.step(progress);
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.step(progress);
        }
    }

    fn extra(&self) -> Params {
        self.scheduler
            .as_ref()
            .map(|s| s.get_params().clone())
            .unwrap_or_default()
    }
}
