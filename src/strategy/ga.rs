use super::VariablePopulation;
use crate::core::{Branch, Chain, Genotype, Initializer, NullOperator, Operator};
use crate::error::{ConfigError, EvoResult};
use crate::selection::{ParentSelection, SurvivorSelection};

/// Builds a genetic algorithm.
///
/// Each offspring is produced by mutation with probability `pmut`, then
/// crossover with probability `pcross` (either step is otherwise a copy).
/// The result is a [`VariablePopulation`] named `"GA"`.
///
/// # Errors
/// Returns [`ConfigError::InvalidParameter`] if a probability lies outside
/// `[0, 1]`.
///
/// # References
///
/// - Holland (1975), *Adaptation in Natural and Artificial Systems*
/// - Goldberg (1989), *Genetic Algorithms in Search, Optimization, and
///   Machine Learning*
#[allow(clippy::too_many_arguments)]
pub fn genetic_algorithm<G: Genotype>(
    initializer: impl Initializer<G> + 'static,
    mutation: impl Operator<G> + 'static,
    crossover: impl Operator<G> + 'static,
    parent_selection: ParentSelection,
    survivor_selection: SurvivorSelection,
    pmut: f64,
    pcross: f64,
) -> EvoResult<VariablePopulation<G>> {
    for (name, p) in [("pmut", pmut), ("pcross", pcross)] {
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::invalid(
                name,
                format!("must be in [0, 1], got {p}"),
            ));
        }
    }

    let evolve = Chain::new(
        Branch::new(mutation, NullOperator, pmut),
        Branch::new(crossover, NullOperator, pcross),
    );

    Ok(VariablePopulation::new(initializer, evolve)
        .with_name("GA")
        .with_parent_selection(parent_selection)
        .with_survivor_selection(survivor_selection))
}
