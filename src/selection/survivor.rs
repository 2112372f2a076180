//! Survivor selection.
//!
//! Decides which of the current population and the freshly evaluated
//! offspring form the next generation. All functions work on normalized
//! fitness (higher is better) and, unless noted, return exactly
//! `population.len()` individuals.
//!
//! # References
//!
//! - Eiben & Smith (2015), *Introduction to Evolutionary Computing*, Ch. 5
//! - Schwefel (1995), *Evolution and Optimum Seeking* — (μ+λ) and (μ,λ)

use super::reef::cro_selection;
use crate::core::{sort_descending, Individual, ParamScheduler, Params, Schedulable};
use crate::error::{ConfigError, EvoResult};
use rand::Rng;

/// Each child replaces its paired parent if strictly fitter.
///
/// Parents without a paired child are kept unchanged; surplus children are
/// dropped.
pub fn one_to_one<G>(
    population: Vec<Individual<G>>,
    offspring: Vec<Individual<G>>,
) -> Vec<Individual<G>> {
    let mut children = offspring.into_iter();
    population
        .into_iter()
        .map(|parent| match children.next() {
            Some(child) if child.fitness() > parent.fitness() => child,
            _ => parent,
        })
        .collect()
}

/// Like [`one_to_one`], but a fitter child only wins with probability `p`.
pub fn prob_one_to_one<G, R: Rng + ?Sized>(
    population: Vec<Individual<G>>,
    offspring: Vec<Individual<G>>,
    p: f64,
    rng: &mut R,
) -> Vec<Individual<G>> {
    let p = p.clamp(0.0, 1.0);
    let mut children = offspring.into_iter();
    population
        .into_iter()
        .map(|parent| match children.next() {
            Some(child) if rng.random_bool(p) && child.fitness() > parent.fitness() => child,
            _ => parent,
        })
        .collect()
}

/// Top `amount` parents followed by the best offspring.
///
/// When there are too few offspring the remaining slots go to the next best
/// parents.
pub fn elitism<G>(
    population: Vec<Individual<G>>,
    offspring: Vec<Individual<G>>,
    amount: usize,
) -> Vec<Individual<G>> {
    let target = population.len();
    let amount = amount.min(target);

    let mut elites = population;
    sort_descending(&mut elites);
    let mut rest = elites.split_off(amount);

    let mut children = offspring;
    sort_descending(&mut children);
    children.truncate(target - amount);

    let mut next = elites;
    next.extend(children);
    fill_from(&mut next, &mut rest, target);
    next
}

/// Best offspring, where an elite parent displaces the weakest kept child
/// only if it is strictly fitter.
///
/// Promoted parents come first, then the kept offspring in descending order.
pub fn cond_elitism<G>(
    population: Vec<Individual<G>>,
    offspring: Vec<Individual<G>>,
    amount: usize,
) -> Vec<Individual<G>> {
    let target = population.len();
    let amount = amount.min(target);

    let mut elites = population;
    sort_descending(&mut elites);
    let mut rest = elites.split_off(amount);

    let mut children = offspring;
    sort_descending(&mut children);
    children.truncate(target);

    let mut promoted = Vec::with_capacity(amount);
    for elite in elites {
        if promoted.len() + children.len() < target {
            promoted.push(elite);
        } else if children
            .last()
            .is_some_and(|worst| elite.fitness() > worst.fitness())
        {
            children.pop();
            promoted.push(elite);
        }
    }

    let mut next = promoted;
    next.extend(children);
    fill_from(&mut next, &mut rest, target);
    next
}

/// (λ+μ): the best `population.len()` of parents and offspring together.
pub fn plus_selection<G>(
    population: Vec<Individual<G>>,
    offspring: Vec<Individual<G>>,
) -> Vec<Individual<G>> {
    let target = population.len();
    let mut pool = population;
    pool.extend(offspring);
    sort_descending(&mut pool);
    pool.truncate(target);
    pool
}

/// (λ,μ): the best `population.len()` offspring; parents are discarded.
///
/// When there are too few offspring the remaining slots go to the best
/// parents.
pub fn comma_selection<G>(
    population: Vec<Individual<G>>,
    offspring: Vec<Individual<G>>,
) -> Vec<Individual<G>> {
    let target = population.len();
    let mut next = offspring;
    sort_descending(&mut next);
    next.truncate(target);

    if next.len() < target {
        let mut parents = population;
        sort_descending(&mut parents);
        fill_from(&mut next, &mut parents, target);
    }
    next
}

fn fill_from<G>(next: &mut Vec<Individual<G>>, donors: &mut Vec<Individual<G>>, target: usize) {
    let shortfall = target.saturating_sub(next.len()).min(donors.len());
    next.extend(donors.drain(..shortfall));
}

/// Survivor selection method and its parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SurvivorMethod {
    /// Offspring replace the population as-is. The population size follows
    /// the offspring count.
    Generational,
    /// See [`one_to_one`].
    OneToOne,
    /// See [`prob_one_to_one`].
    ProbOneToOne { p: f64 },
    /// See [`elitism`].
    Elitism { amount: usize },
    /// See [`cond_elitism`].
    CondElitism { amount: usize },
    /// See [`plus_selection`].
    PlusSelection,
    /// See [`comma_selection`].
    CommaSelection,
    /// See [`cro_selection`](super::cro_selection). The size fluctuates
    /// between 2 and `capacity`.
    Cro {
        fd: f64,
        pd: f64,
        attempts: usize,
        capacity: usize,
    },
}

/// A survivor selection method, optionally driven by a [`ParamScheduler`].
///
/// Scheduled keys: `p` (ProbOneToOne), `amount` (Elitism, CondElitism),
/// `Fd`, `Pd`, `attempts` (Cro).
///
/// # Examples
///
/// ```
/// use u_evosearch::selection::{SurvivorMethod, SurvivorSelection};
/// use u_evosearch::core::Params;
///
/// let sel = SurvivorSelection::from_params("Elitism", &Params::new().with("amount", 2.0)).unwrap();
/// assert_eq!(sel.method(), &SurvivorMethod::Elitism { amount: 2 });
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurvivorSelection {
    method: SurvivorMethod,
    scheduler: Option<ParamScheduler>,
}

impl Default for SurvivorSelection {
    fn default() -> Self {
        Self::new(SurvivorMethod::Generational)
    }
}

impl SurvivorSelection {
    pub fn new(method: SurvivorMethod) -> Self {
        Self {
            method,
            scheduler: None,
        }
    }

    /// Builds a selection from a method name and parameter bag.
    ///
    /// Recognized names (case-insensitive): `Generational`, `One-to-one`,
    /// `Prob-one-to-one` (`p`), `Elitism` (`amount`), `CondElitism`
    /// (`amount`), `(m+n)`, `(m,n)`, `CRO` (`Fd`, `Pd`, `attempts`,
    /// `maxPopSize`).
    pub fn from_params(name: &str, params: &Params) -> EvoResult<Self> {
        let method = match name.to_ascii_lowercase().as_str() {
            "generational" | "nothing" => SurvivorMethod::Generational,
            "one-to-one" | "hillclimb" => SurvivorMethod::OneToOne,
            "prob-one-to-one" | "probhillclimb" => SurvivorMethod::ProbOneToOne {
                p: params.require("p")?,
            },
            "elitism" => SurvivorMethod::Elitism {
                amount: params.require_count("amount")?,
            },
            "condelitism" => SurvivorMethod::CondElitism {
                amount: params.require_count("amount")?,
            },
            "(m+n)" | "plus" => SurvivorMethod::PlusSelection,
            "(m,n)" | "comma" => SurvivorMethod::CommaSelection,
            "cro" => SurvivorMethod::Cro {
                fd: params.require("Fd")?,
                pd: params.require("Pd")?,
                attempts: params.require_count("attempts")?,
                capacity: params.require_count("maxPopSize")?,
            },
            _ => {
                return Err(ConfigError::UnknownMethod {
                    kind: "survivor selection",
                    name: name.to_string(),
                })
            }
        };
        let selection = Self::new(method);
        selection.validate()?;
        Ok(selection)
    }

    /// Drives the method's parameters from a schedule.
    pub fn with_scheduler(mut self, scheduler: ParamScheduler) -> Self {
        self.apply(scheduler.get_params());
        self.scheduler = Some(scheduler);
        self
    }

    pub fn method(&self) -> &SurvivorMethod {
        &self.method
    }

    pub fn validate(&self) -> EvoResult<()> {
        match self.method {
            SurvivorMethod::ProbOneToOne { p } if !(0.0..=1.0).contains(&p) => {
                Err(ConfigError::invalid("p", format!("must be in [0, 1], got {p}")))
            }
            SurvivorMethod::Cro {
                fd,
                pd,
                attempts,
                capacity,
            } => {
                if !(0.0..=1.0).contains(&fd) {
                    return Err(ConfigError::invalid("Fd", format!("must be in [0, 1], got {fd}")));
                }
                if !(0.0..=1.0).contains(&pd) {
                    return Err(ConfigError::invalid("Pd", format!("must be in [0, 1], got {pd}")));
                }
                if attempts == 0 {
                    return Err(ConfigError::invalid("attempts", "must be at least 1"));
                }
                if capacity < 2 {
                    return Err(ConfigError::PopulationTooSmall {
                        size: capacity,
                        min: 2,
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Selects the next generation.
    pub fn select<G, R: Rng + ?Sized>(
        &self,
        population: Vec<Individual<G>>,
        offspring: Vec<Individual<G>>,
        rng: &mut R,
    ) -> Vec<Individual<G>> {
        match self.method {
            SurvivorMethod::Generational => offspring,
            SurvivorMethod::OneToOne => one_to_one(population, offspring),
            SurvivorMethod::ProbOneToOne { p } => prob_one_to_one(population, offspring, p, rng),
            SurvivorMethod::Elitism { amount } => elitism(population, offspring, amount),
            SurvivorMethod::CondElitism { amount } => cond_elitism(population, offspring, amount),
            SurvivorMethod::PlusSelection => plus_selection(population, offspring),
            SurvivorMethod::CommaSelection => comma_selection(population, offspring),
            SurvivorMethod::Cro {
                fd,
                pd,
                attempts,
                capacity,
            } => cro_selection(population, offspring, fd, pd, attempts, capacity, rng),
        }
    }

    fn apply(&mut self, params: &Params) {
        match &mut self.method {
            SurvivorMethod::ProbOneToOne { p } => {
                *p = params.get_or("p", *p).clamp(0.0, 1.0);
            }
            SurvivorMethod::Elitism { amount } | SurvivorMethod::CondElitism { amount } => {
                *amount = params.get_or("amount", *amount as f64).max(0.0).round() as usize;
            }
            SurvivorMethod::Cro {
                fd, pd, attempts, ..
            } => {
                *fd = params.get_or("Fd", *fd).clamp(0.0, 1.0);
                *pd = params.get_or("Pd", *pd).clamp(0.0, 1.0);
                *attempts = params.get_or("attempts", *attempts as f64).max(1.0).round() as usize;
            }
            _ => {}
        }
    }
}

impl Schedulable for SurvivorSelection {
    fn step(&mut self, progress: f64) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.step(progress);
            self.apply(scheduler.get_params());
            self.scheduler = Some(scheduler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ParamValue, ScheduleMethod};
    use crate::random::create_rng;

    fn pop(fitnesses: &[f64], tag: u32) -> Vec<Individual<u32>> {
        fitnesses
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                let mut ind = Individual::new(tag + i as u32);
                ind.set_fitness(f);
                ind
            })
            .collect()
    }

    fn fits(pop: &[Individual<u32>]) -> Vec<f64> {
        pop.iter().map(|i| i.fitness()).collect()
    }

    #[test]
    fn test_one_to_one_pairs() {
        let out = one_to_one(pop(&[1.0, 5.0, 3.0], 0), pop(&[2.0, 4.0, 3.0], 100));
        assert_eq!(fits(&out), vec![2.0, 5.0, 3.0]);
        // tie keeps the parent
        assert_eq!(*out[2].genotype(), 2);
    }

    #[test]
    fn test_one_to_one_leftover_parents() {
        let out = one_to_one(pop(&[1.0, 2.0, 3.0, 4.0], 0), pop(&[9.0], 100));
        assert_eq!(fits(&out), vec![9.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_prob_one_to_one_zero_keeps_parents() {
        let mut rng = create_rng(42);
        let parents = pop(&[1.0, 2.0, 3.0], 0);
        let out = prob_one_to_one(parents.clone(), pop(&[9.0, 9.0, 9.0], 100), 0.0, &mut rng);
        assert_eq!(out, parents);
    }

    #[test]
    fn test_prob_one_to_one_one_behaves_like_one_to_one() {
        let mut rng = create_rng(42);
        let out = prob_one_to_one(pop(&[1.0, 5.0], 0), pop(&[2.0, 4.0], 100), 1.0, &mut rng);
        assert_eq!(fits(&out), vec![2.0, 5.0]);
    }

    #[test]
    fn test_elitism_example() {
        let out = elitism(pop(&[1.0, 2.0, 3.0, 4.0], 0), pop(&[5.0, 0.0, 0.0, 0.0], 100), 1);
        assert_eq!(fits(&out), vec![4.0, 5.0, 0.0, 0.0]);
        assert_eq!(*out[0].genotype(), 3);
    }

    #[test]
    fn test_elitism_fills_with_parents() {
        let out = elitism(pop(&[1.0, 2.0, 3.0, 4.0], 0), pop(&[9.0], 100), 1);
        assert_eq!(fits(&out), vec![4.0, 9.0, 3.0, 2.0]);
    }

    #[test]
    fn test_elitism_amount_larger_than_population() {
        let out = elitism(pop(&[1.0, 2.0], 0), pop(&[9.0, 9.0], 100), 5);
        assert_eq!(fits(&out), vec![2.0, 1.0]);
    }

    #[test]
    fn test_cond_elitism_promotes_only_fitter_parents() {
        // elite parents 10 and 4; kept children [8, 6, 5]
        let out = cond_elitism(
            pop(&[10.0, 4.0, 1.0], 0),
            pop(&[8.0, 6.0, 5.0, 2.0], 100),
            2,
        );
        // 10 > 5 displaces 5; 4 < 6 is rejected
        assert_eq!(fits(&out), vec![10.0, 8.0, 6.0]);
    }

    #[test]
    fn test_cond_elitism_no_promotion_when_offspring_better() {
        let out = cond_elitism(pop(&[1.0, 2.0], 0), pop(&[5.0, 6.0], 100), 1);
        assert_eq!(fits(&out), vec![6.0, 5.0]);
    }

    #[test]
    fn test_cond_elitism_shortfall() {
        let out = cond_elitism(pop(&[1.0, 2.0, 3.0], 0), Vec::new(), 1);
        assert_eq!(fits(&out), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_plus_selection() {
        let out = plus_selection(pop(&[1.0, 7.0, 3.0], 0), pop(&[5.0, 2.0], 100));
        assert_eq!(fits(&out), vec![7.0, 5.0, 3.0]);
    }

    #[test]
    fn test_comma_selection_discards_parents() {
        let out = comma_selection(pop(&[100.0, 100.0], 0), pop(&[1.0, 3.0, 2.0], 100));
        assert_eq!(fits(&out), vec![3.0, 2.0]);
    }

    #[test]
    fn test_comma_selection_shortfall() {
        let out = comma_selection(pop(&[1.0, 7.0, 3.0], 0), pop(&[2.0], 100));
        assert_eq!(fits(&out), vec![2.0, 7.0, 3.0]);
    }

    #[test]
    fn test_generational_returns_offspring() {
        let mut rng = create_rng(1);
        let sel = SurvivorSelection::default();
        let out = sel.select(pop(&[1.0, 2.0], 0), pop(&[0.0, 0.0, 0.0], 100), &mut rng);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_from_params() {
        let params = Params::new()
            .with("amount", 3.0)
            .with("p", 0.3)
            .with("Fd", 0.1)
            .with("Pd", 0.9)
            .with("attempts", 3.0)
            .with("maxPopSize", 20.0);

        let cases = [
            ("Elitism", SurvivorMethod::Elitism { amount: 3 }),
            ("condelitism", SurvivorMethod::CondElitism { amount: 3 }),
            ("(m+n)", SurvivorMethod::PlusSelection),
            ("(m,n)", SurvivorMethod::CommaSelection),
            ("One-to-one", SurvivorMethod::OneToOne),
            ("Prob-one-to-one", SurvivorMethod::ProbOneToOne { p: 0.3 }),
            ("Generational", SurvivorMethod::Generational),
            (
                "CRO",
                SurvivorMethod::Cro {
                    fd: 0.1,
                    pd: 0.9,
                    attempts: 3,
                    capacity: 20,
                },
            ),
        ];
        for (name, expected) in cases {
            let sel = SurvivorSelection::from_params(name, &params).unwrap();
            assert_eq!(sel.method(), &expected, "method {name}");
        }
    }

    #[test]
    fn test_from_params_errors() {
        assert_eq!(
            SurvivorSelection::from_params("Elitism", &Params::new()),
            Err(ConfigError::MissingParameter("amount".into()))
        );
        assert!(matches!(
            SurvivorSelection::from_params("tournament", &Params::new()),
            Err(ConfigError::UnknownMethod { .. })
        ));
        assert!(SurvivorSelection::from_params("Prob-one-to-one", &Params::new().with("p", 2.0))
            .is_err());
    }

    #[test]
    fn test_scheduled_amount() {
        let mut sel = SurvivorSelection::new(SurvivorMethod::Elitism { amount: 0 }).with_scheduler(
            ParamScheduler::new(ScheduleMethod::Linear).with_param("amount", ParamValue::Range(0.0, 10.0)),
        );
        assert_eq!(sel.method(), &SurvivorMethod::Elitism { amount: 0 });
        sel.step(0.5);
        assert_eq!(sel.method(), &SurvivorMethod::Elitism { amount: 5 });
    }
}
