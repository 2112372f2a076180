use super::{apply_operator, check_parents, check_pop_size, SearchState, SearchStrategy};
use crate::core::{
    Genotype, Individual, Initializer, Objective, Operator, OperatorContext, ParamScheduler, Params,
    Schedulable,
};
use crate::error::EvoResult;
use crate::selection::{ParentSelection, SurvivorSelection};
use rand::RngCore;

/// Evolves every parent into exactly one offspring.
///
/// Survivor selection sees matched parent and offspring lists, which suits
/// pairwise methods such as [`one_to_one`](crate::selection::one_to_one).
/// Defaults: no parent selection, generational replacement.
pub struct StaticPopulation<G> {
    name: String,
    state: SearchState<G>,
    initializer: Box<dyn Initializer<G>>,
    operator: Box<dyn Operator<G>>,
    parent_selection: ParentSelection,
    survivor_selection: SurvivorSelection,
    scheduler: Option<ParamScheduler>,
}

impl<G: Genotype> StaticPopulation<G> {
    pub fn new(
        initializer: impl Initializer<G> + 'static,
        operator: impl Operator<G> + 'static,
    ) -> Self {
        Self {
            name: "Static Population Evolution".to_string(),
            state: SearchState::new(),
            initializer: Box::new(initializer),
            operator: Box::new(operator),
            parent_selection: ParentSelection::default(),
            survivor_selection: SurvivorSelection::default(),
            scheduler: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
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
}

impl<G: Genotype> SearchStrategy<G> for StaticPopulation<G> {
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
            parents
                .iter()
                .map(|parent| apply_operator(self.operator.as_ref(), parent, &ctx, rng))
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
