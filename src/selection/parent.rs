//! Parent selection.
//!
//! Chooses which individuals are handed to the perturbation step.
//! Selection pressure ranges from none ([`ParentMethod::Nothing`] and
//! [`ParentMethod::Random`]) to truncation ([`ParentMethod::Best`]).
//!
//! All methods work on normalized fitness, so **higher is better**.
//!
//! # References
//!
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"
//! - Baker (1985), "Adaptive Selection Methods for Genetic Algorithms"

use crate::core::{sort_descending, Individual, ParamScheduler, Params, Schedulable};
use crate::error::{ConfigError, EvoResult};
use rand::Rng;

/// Parent selection method and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParentMethod {
    /// The whole population, unchanged.
    #[default]
    Nothing,
    /// The `amount` fittest individuals.
    Best { amount: usize },
    /// `amount` uniform draws with replacement.
    Random { amount: usize },
    /// `amount` tournaments of `size` uniform draws, the fittest wins.
    ///
    /// - size 2: light pressure
    /// - size 3-5: moderate pressure
    /// - larger: strong pressure, risk of premature convergence
    Tournament { amount: usize, size: usize },
    /// `amount` fitness-proportionate draws.
    ///
    /// Weights are shifted by the population minimum so negative fitness
    /// works.
    Roulette { amount: usize },
    /// `amount` draws proportional to linear rank (best has weight `n`).
    Rank { amount: usize },
}

/// A parent selection method, optionally driven by a [`ParamScheduler`].
///
/// Scheduled keys: `amount`, `size`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParentSelection {
    method: ParentMethod,
    scheduler: Option<ParamScheduler>,
}

impl ParentSelection {
    pub fn new(method: ParentMethod) -> Self {
        Self {
            method,
            scheduler: None,
        }
    }

    /// Builds a selection from a method name and parameter bag.
    ///
    /// Recognized names (case-insensitive): `Nothing`, `Best` (`amount`),
    /// `Random` (`amount`), `Tournament` (`amount`, `p` as size), `Roulette`
    /// (`amount`), `Rank` (`amount`).
    pub fn from_params(name: &str, params: &Params) -> EvoResult<Self> {
        let method = match name.to_ascii_lowercase().as_str() {
            "nothing" => ParentMethod::Nothing,
            "best" => ParentMethod::Best {
                amount: params.require_count("amount")?,
            },
            "random" => ParentMethod::Random {
                amount: params.require_count("amount")?,
            },
            "tournament" => ParentMethod::Tournament {
                amount: params.require_count("amount")?,
                size: match params.get("size") {
                    Some(_) => params.require_count("size")?,
                    None => params.require_count("p")?,
                },
            },
            "roulette" => ParentMethod::Roulette {
                amount: params.require_count("amount")?,
            },
            "rank" => ParentMethod::Rank {
                amount: params.require_count("amount")?,
            },
            _ => {
                return Err(ConfigError::UnknownMethod {
                    kind: "parent selection",
                    name: name.to_string(),
                })
            }
        };
        let selection = Self::new(method);
        selection.validate()?;
        Ok(selection)
    }

    /// Drives `amount` (and `size`) from a schedule.
    pub fn with_scheduler(mut self, scheduler: ParamScheduler) -> Self {
        self.apply(scheduler.get_params());
        self.scheduler = Some(scheduler);
        self
    }

    pub fn method(&self) -> ParentMethod {
        self.method
    }

    /// Rejects methods that would select no parent at all.
    pub fn validate(&self) -> EvoResult<()> {
        match self.method {
            ParentMethod::Best { amount: 0 }
            | ParentMethod::Random { amount: 0 }
            | ParentMethod::Tournament { amount: 0, .. }
            | ParentMethod::Roulette { amount: 0 }
            | ParentMethod::Rank { amount: 0 } => {
                Err(ConfigError::invalid("amount", "must be at least 1"))
            }
            ParentMethod::Tournament { size: 0, .. } => {
                Err(ConfigError::invalid("size", "tournament size must be at least 1"))
            }
            _ => Ok(()),
        }
    }

    /// Selects parents from `population`.
    ///
    /// # Panics
    /// Panics if a sampling method is asked to draw from an empty
    /// population.
    pub fn select<G: Clone, R: Rng + ?Sized>(
        &self,
        population: &[Individual<G>],
        rng: &mut R,
    ) -> Vec<Individual<G>> {
        match self.method {
            ParentMethod::Nothing => population.to_vec(),
            ParentMethod::Best { amount } => best(population, amount),
            ParentMethod::Random { amount } => {
                draw(population, amount, rng, |pop, rng| random_index(pop, rng))
            }
            ParentMethod::Tournament { amount, size } => {
                draw(population, amount, rng, |pop, rng| tournament(pop, size, rng))
            }
            ParentMethod::Roulette { amount } => draw(population, amount, rng, roulette),
            ParentMethod::Rank { amount } => {
                let order = rank_order(population);
                draw(population, amount, rng, |_, rng| rank(&order, rng))
            }
        }
    }

    fn apply(&mut self, params: &Params) {
        let count = |key: &str, current: usize| {
            params.get_or(key, current as f64).max(0.0).round() as usize
        };
        match &mut self.method {
            ParentMethod::Nothing => {}
            ParentMethod::Best { amount }
            | ParentMethod::Random { amount }
            | ParentMethod::Roulette { amount }
            | ParentMethod::Rank { amount } => *amount = count("amount", *amount),
            ParentMethod::Tournament { amount, size } => {
                *amount = count("amount", *amount);
                *size = count("size", *size).max(1);
            }
        }
    }
}

impl Schedulable for ParentSelection {
    fn step(&mut self, progress: f64) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.step(progress);
            self.apply(scheduler.get_params());
            self.scheduler = Some(scheduler);
        }
    }
}

fn best<G: Clone>(population: &[Individual<G>], amount: usize) -> Vec<Individual<G>> {
    let mut sorted = population.to_vec();
    sort_descending(&mut sorted);
    sorted.truncate(amount);
    sorted
}

fn draw<G: Clone, R: Rng + ?Sized>(
    population: &[Individual<G>],
    amount: usize,
    rng: &mut R,
    mut pick: impl FnMut(&[Individual<G>], &mut R) -> usize,
) -> Vec<Individual<G>> {
    if amount > 0 {
        assert!(
            !population.is_empty(),
            "cannot select from empty population"
        );
    }
    (0..amount)
        .map(|_| population[pick(population, rng)].clone())
        .collect()
}

fn random_index<G, R: Rng + ?Sized>(population: &[Individual<G>], rng: &mut R) -> usize {
    rng.random_range(0..population.len())
}

/// Tournament selection: pick `k` random individuals, return the fittest.
fn tournament<G, R: Rng + ?Sized>(population: &[Individual<G>], k: usize, rng: &mut R) -> usize {
    let k = k.max(1);
    let n = population.len();

    let mut best_idx = rng.random_range(0..n);
    for _ in 1..k {
        let idx = rng.random_range(0..n);
        if population[idx].fitness() > population[best_idx].fitness() {
            best_idx = idx;
        }
    }
    best_idx
}

/// Roulette wheel over `fitness - min + epsilon`.
fn roulette<G, R: Rng + ?Sized>(population: &[Individual<G>], rng: &mut R) -> usize {
    let n = population.len();
    if n == 1 {
        return 0;
    }

    let fitnesses: Vec<f64> = population.iter().map(|ind| ind.fitness()).collect();
    let min_fitness = fitnesses
        .iter()
        .copied()
        .filter(|f| f.is_finite())
        .fold(f64::INFINITY, f64::min);

    let epsilon = 1e-10;
    let weights: Vec<f64> = fitnesses
        .iter()
        .map(|&f| {
            let w = f - min_fitness + epsilon;
            if w.is_finite() && w > 0.0 {
                w
            } else {
                epsilon
            }
        })
        .collect();

    let total: f64 = weights.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        return rng.random_range(0..n);
    }

    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative > threshold {
            return i;
        }
    }

    n - 1 // floating-point fallback
}

/// Population indices, best first.
fn rank_order<G>(population: &[Individual<G>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..population.len()).collect();
    order.sort_by(|&a, &b| population[b].fitness().total_cmp(&population[a].fitness()));
    order
}

/// Linear ranking: rank 0 (best) has weight `n`, the worst weight 1.
fn rank<R: Rng + ?Sized>(order: &[usize], rng: &mut R) -> usize {
    let n = order.len();
    if n == 1 {
        return order[0];
    }

    let total = (n * (n + 1)) as f64 / 2.0;
    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (rank, &idx) in order.iter().enumerate() {
        cumulative += (n - rank) as f64;
        if cumulative > threshold {
            return idx;
        }
    }

    order[n - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ParamValue, ScheduleMethod};
    use crate::random::create_rng;

    fn make_population(fitnesses: &[f64]) -> Vec<Individual<usize>> {
        fitnesses
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                let mut ind = Individual::new(i);
                ind.set_fitness(f);
                ind
            })
            .collect()
    }

    fn counts(sel: ParentSelection, pop: &[Individual<usize>], draws: usize) -> Vec<u32> {
        let mut rng = create_rng(42);
        let mut counts = vec![0u32; pop.len()];
        for ind in sel.select(pop, &mut rng).into_iter().take(draws) {
            counts[*ind.genotype()] += 1;
        }
        counts
    }

    #[test]
    fn test_nothing_is_identity() {
        let pop = make_population(&[1.0, 2.0, 3.0]);
        let mut rng = create_rng(42);
        assert_eq!(ParentSelection::default().select(&pop, &mut rng), pop);
    }

    #[test]
    fn test_best_takes_fittest() {
        let pop = make_population(&[1.0, 9.0, 3.0, 7.0]);
        let mut rng = create_rng(42);
        let out = ParentSelection::new(ParentMethod::Best { amount: 2 }).select(&pop, &mut rng);
        let ids: Vec<usize> = out.iter().map(|i| *i.genotype()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_random_draws_amount() {
        let pop = make_population(&[1.0, 2.0]);
        let mut rng = create_rng(42);
        let out = ParentSelection::new(ParentMethod::Random { amount: 7 }).select(&pop, &mut rng);
        assert_eq!(out.len(), 7);
    }

    #[test]
    fn test_tournament_favors_best() {
        let pop = make_population(&[-10.0, -5.0, -1.0, -8.0]);
        let n = 10_000;
        let c = counts(
            ParentSelection::new(ParentMethod::Tournament { amount: n, size: 4 }),
            &pop,
            n,
        );
        assert!(c[2] > 6000, "expected best to dominate, got {c:?}");
    }

    #[test]
    fn test_tournament_size_1_is_random() {
        let pop = make_population(&[10.0, 5.0, 1.0, 8.0]);
        let n = 10_000;
        let c = counts(
            ParentSelection::new(ParentMethod::Tournament { amount: n, size: 1 }),
            &pop,
            n,
        );
        for &x in &c {
            assert!(x > 1500, "expected uniform, got counts: {c:?}");
        }
    }

    #[test]
    fn test_roulette_favors_best() {
        let pop = make_population(&[-100.0, -50.0, -1.0, -80.0]);
        let n = 10_000;
        let c = counts(ParentSelection::new(ParentMethod::Roulette { amount: n }), &pop, n);
        assert!(c[2] > c[0], "best should be selected more often: {c:?}");
    }

    #[test]
    fn test_rank_favors_best() {
        let pop = make_population(&[1.0, 50.0, 100.0, 20.0]);
        let n = 10_000;
        let c = counts(ParentSelection::new(ParentMethod::Rank { amount: n }), &pop, n);
        assert!(c[2] > c[0], "best should be selected more: {c:?}");
    }

    #[test]
    fn test_roulette_handles_unevaluated() {
        let mut pop = make_population(&[1.0, 2.0]);
        pop.push(Individual::new(2));
        let mut rng = create_rng(42);
        let out = ParentSelection::new(ParentMethod::Roulette { amount: 20 }).select(&pop, &mut rng);
        assert_eq!(out.len(), 20);
    }

    #[test]
    fn test_single_individual() {
        let pop = make_population(&[5.0]);
        let mut rng = create_rng(42);
        for method in [
            ParentMethod::Tournament { amount: 1, size: 3 },
            ParentMethod::Roulette { amount: 1 },
            ParentMethod::Rank { amount: 1 },
        ] {
            let out = ParentSelection::new(method).select(&pop, &mut rng);
            assert_eq!(*out[0].genotype(), 0);
        }
    }

    #[test]
    #[should_panic(expected = "cannot select from empty population")]
    fn test_empty_population_panics() {
        let pop: Vec<Individual<usize>> = vec![];
        let mut rng = create_rng(42);
        ParentSelection::new(ParentMethod::Tournament { amount: 1, size: 3 }).select(&pop, &mut rng);
    }

    #[test]
    fn test_from_params() {
        let params = Params::new().with("amount", 4.0).with("p", 3.0);
        let sel = ParentSelection::from_params("Tournament", &params).unwrap();
        assert_eq!(sel.method(), ParentMethod::Tournament { amount: 4, size: 3 });
        assert!(ParentSelection::from_params("Best", &Params::new()).is_err());
        assert!(ParentSelection::from_params("lottery", &params).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_draws() {
        assert!(ParentSelection::new(ParentMethod::Nothing).validate().is_ok());
        assert_eq!(
            ParentSelection::new(ParentMethod::Best { amount: 0 }).validate(),
            Err(ConfigError::invalid("amount", "must be at least 1"))
        );
        assert!(ParentSelection::new(ParentMethod::Tournament { amount: 0, size: 3 })
            .validate()
            .is_err());
        assert!(ParentSelection::new(ParentMethod::Tournament { amount: 4, size: 0 })
            .validate()
            .is_err());
        let params = Params::new().with("amount", 0.0);
        assert!(ParentSelection::from_params("Roulette", &params).is_err());
    }

    #[test]
    fn test_scheduled_amount() {
        let mut sel = ParentSelection::new(ParentMethod::Best { amount: 10 }).with_scheduler(
            ParamScheduler::new(ScheduleMethod::Linear).with_param("amount", ParamValue::Range(10.0, 2.0)),
        );
        sel.step(1.0);
        assert_eq!(sel.method(), ParentMethod::Best { amount: 2 });
    }
}
