use super::{apply_operator, check_parents, SearchState, SearchStrategy};
use crate::core::{Genotype, Individual, Initializer, Objective, Operator, OperatorContext};
use crate::error::{ConfigError, EvoResult};
use rand::RngCore;

/// Stochastic hill climbing.
///
/// Each generation, every individual is perturbed `iterations` times and
/// replaced whenever the candidate is strictly fitter. Accepted candidates
/// remember the individual they improved on as their personal best.
pub struct HillClimb<G> {
    name: String,
    state: SearchState<G>,
    initializer: Box<dyn Initializer<G>>,
    operator: Box<dyn Operator<G>>,
    iterations: usize,
}

impl<G: Genotype> HillClimb<G> {
    pub fn new(
        initializer: impl Initializer<G> + 'static,
        operator: impl Operator<G> + 'static,
    ) -> Self {
        Self {
            name: "HillClimb".to_string(),
            state: SearchState::new(),
            initializer: Box::new(initializer),
            operator: Box::new(operator),
            iterations: 1,
        }
    }

    /// Perturbations per individual and generation.
    pub fn with_iterations(mut self, iterations: usize) -> EvoResult<Self> {
        if iterations == 0 {
            return Err(ConfigError::invalid("iters", "must be at least 1"));
        }
        self.iterations = iterations;
        Ok(self)
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

impl<G: Genotype> SearchStrategy<G> for HillClimb<G> {
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

    fn perturb(
        &mut self,
        parents: &[Individual<G>],
        objective: &dyn Objective<G>,
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        check_parents(parents, &self.name);
        let mut calls = 0;
        let climbed = {
            let best = self.state.best().unwrap_or(&parents[0]);
            let ctx = OperatorContext {
                population: parents,
                objective,
                global_best: best,
                initializer: self.initializer.as_ref(),
            };
            parents
                .iter()
                .map(|parent| {
                    let mut current = parent.clone();
                    for _ in 0..self.iterations {
                        let mut candidate = apply_operator(self.operator.as_ref(), &current, &ctx, rng);
                        if candidate.evaluate(objective) {
                            calls += 1;
                        }
                        if candidate.fitness() > current.fitness() {
                            candidate.store_best(&current);
                            current = candidate;
                        }
                    }
                    current
                })
                .collect()
        };
        self.state.record_evaluations(calls);
        climbed
    }

    fn select_individuals(
        &mut self,
        _population: Vec<Individual<G>>,
        offspring: Vec<Individual<G>>,
        _rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        offspring
    }

    fn update_params(&mut self, progress: f64) {
        self.operator.step(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_empty_population_rejected() {
        let strategy = HillClimb::new(BitInit { len: 4, pop_size: 0 }, bit_flip());
        assert_eq!(
            strategy.validate(),
            Err(ConfigError::PopulationTooSmall { size: 0, min: 1 })
        );
        let strategy = HillClimb::new(BitInit { len: 4, pop_size: 1 }, bit_flip());
        assert!(strategy.validate().is_ok());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let result = HillClimb::new(UniformInit { dim: 2, pop_size: 1 }, noise("Noise", 0.1))
            .with_iterations(0);
        assert!(result.is_err());
    }

    #[test]
    fn test_never_worsens() {
        let mut rng = create_rng(42);
        let mut strategy = HillClimb::new(UniformInit { dim: 2, pop_size: 3 }, noise("Noise", 1.0))
            .with_iterations(5)
            .unwrap();
        strategy.initialize(&Sphere, &mut rng);
        let mut previous: Vec<f64> = strategy.state().population().iter().map(|i| i.fitness()).collect();
        for g in 0..30 {
            let outcome = strategy.step(&Sphere, g as f64 / 30.0, &mut rng);
            let current: Vec<f64> = outcome.population.iter().map(|i| i.fitness()).collect();
            for (c, p) in current.iter().zip(&previous) {
                assert!(c >= p);
            }
            previous = current;
        }
        assert_eq!(strategy.state().evaluations(), 3 + 30 * 3 * 5);
    }

    #[test]
    fn test_accepted_moves_record_personal_best() {
        let mut rng = create_rng(42);
        let mut strategy = HillClimb::new(UniformInit { dim: 2, pop_size: 1 }, noise("Noise", 0.5))
            .with_iterations(20)
            .unwrap();
        strategy.initialize(&Sphere, &mut rng);
        let start = strategy.state().population()[0].clone();
        let out = strategy.perturb(&[start.clone()], &Sphere, &mut rng);
        if out[0].fitness() > start.fitness() {
            assert!(out[0].personal_best().is_some());
        }
    }

    #[test]
    fn test_onemax_hill_climb() {
        let mut rng = create_rng(42);
        let mut strategy = HillClimb::new(BitInit { len: 20, pop_size: 1 }, bit_flip())
            .with_iterations(10)
            .unwrap();
        strategy.initialize(&OneMax, &mut rng);
        for g in 0..50 {
            strategy.step(&OneMax, g as f64 / 50.0, &mut rng);
        }
        assert_eq!(strategy.state().best().unwrap().fitness(), 20.0);
    }
}
