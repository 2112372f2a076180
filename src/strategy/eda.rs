//! Univariate marginal distribution algorithms.
//!
//! Each generation refits one independent distribution per gene to the
//! selected parents, then samples every offspring from that model. The
//! sampling runs through a [`VariablePopulation`], so parent selection,
//! survivor selection and the offspring count work as usual.
//!
//! # References
//!
//! - Mühlenbein & Paaß (1996), "From recombination of genes to the
//!   estimation of distributions I. Binary parameters"
//! - Hauschild & Pelikan (2011), "An introduction and survey of
//!   estimation of distribution algorithms"

use super::{SearchState, SearchStrategy, VariablePopulation};
use crate::core::{
    Genotype, Individual, Initializer, Objective, Operator, OperatorContext, Params, Schedulable,
};
use crate::error::{ConfigError, EvoResult};
use crate::selection::{ParentSelection, SurvivorSelection};
use rand::{Rng, RngCore};
use rand_distr::{Binomial, Distribution, StandardNormal};

/// A per-gene distribution that can be refit to a parent list.
///
/// The model doubles as the operator that samples offspring, ignoring the
/// individual it is handed.
pub trait Model<G>: Operator<G> + Clone + 'static {
    /// Re-estimates the model from `parents`. An empty list keeps the
    /// previous estimate.
    fn fit(&mut self, parents: &[Individual<G>], rng: &mut dyn RngCore);

    /// Rejects settings the model cannot sample with.
    fn validate(&self) -> EvoResult<()> {
        Ok(())
    }
}

fn perturbation(noise: f64, rng: &mut dyn RngCore) -> f64 {
    if noise > 0.0 {
        noise * rng.sample::<f64, _>(StandardNormal)
    } else {
        0.0
    }
}

/// Independent normal distribution per coordinate.
///
/// `loc` is refit to the column means of the parents (plus `N(0, noise)`
/// jitter); `scale` stays fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianModel {
    default_loc: f64,
    loc: Vec<f64>,
    scale: f64,
    noise: f64,
}

impl GaussianModel {
    pub fn new(loc: f64, scale: f64, noise: f64) -> Self {
        Self {
            default_loc: loc,
            loc: Vec::new(),
            scale,
            noise,
        }
    }

    /// Per-coordinate means of the last fit (empty before the first one).
    pub fn loc(&self) -> &[f64] {
        &self.loc
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl Schedulable for GaussianModel {}

impl Operator<Vec<f64>> for GaussianModel {
    fn name(&self) -> &str {
        "GaussianSample"
    }

    fn evolve(
        &self,
        individual: &Individual<Vec<f64>>,
        _ctx: &OperatorContext<'_, Vec<f64>>,
        rng: &mut dyn RngCore,
    ) -> Individual<Vec<f64>> {
        let genotype = (0..individual.genotype().len())
            .map(|i| {
                let loc = self.loc.get(i).copied().unwrap_or(self.default_loc);
                loc + self.scale * rng.sample::<f64, _>(StandardNormal)
            })
            .collect();
        Individual::new(genotype)
    }
}

impl Model<Vec<f64>> for GaussianModel {
    fn fit(&mut self, parents: &[Individual<Vec<f64>>], rng: &mut dyn RngCore) {
        let Some(first) = parents.first() else {
            return;
        };
        let rows = parents.len() as f64;
        let mut loc = vec![0.0; first.genotype().len()];
        for parent in parents {
            for (acc, x) in loc.iter_mut().zip(parent.genotype()) {
                *acc += x;
            }
        }
        for value in &mut loc {
            *value = *value / rows + perturbation(self.noise, rng);
        }
        self.loc = loc;
    }

    fn validate(&self) -> EvoResult<()> {
        if !(self.scale.is_finite() && self.scale >= 0.0) {
            return Err(ConfigError::invalid("scale", "must be finite and non-negative"));
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(ConfigError::invalid("noise", "must be finite and non-negative"));
        }
        Ok(())
    }
}

/// Independent binomial distribution `B(n, p_i)` per gene.
///
/// `p` is refit to the column sums over `n * parents` (plus `N(0, noise)`
/// jitter), clipped to `[0, 1]`. On `Vec<bool>` genes count as 0 or 1 and
/// `n` must be 1.
#[derive(Debug, Clone, PartialEq)]
pub struct BinomialModel {
    n: usize,
    default_p: f64,
    p: Vec<f64>,
    noise: f64,
}

impl BinomialModel {
    pub fn new(n: usize, p: f64, noise: f64) -> Self {
        Self {
            n,
            default_p: p,
            p: Vec::new(),
            noise,
        }
    }

    /// Per-gene success probabilities of the last fit.
    pub fn p(&self) -> &[f64] {
        &self.p
    }

    pub fn n(&self) -> usize {
        self.n
    }

    fn p_at(&self, i: usize) -> f64 {
        self.p.get(i).copied().unwrap_or(self.default_p)
    }

    fn draw(&self, i: usize, rng: &mut dyn RngCore) -> usize {
        Binomial::new(self.n as u64, self.p_at(i)).map_or(0, |dist| dist.sample(rng) as usize)
    }

    fn refit(&mut self, columns: Vec<f64>, rows: usize, rng: &mut dyn RngCore) {
        let total = (self.n * rows) as f64;
        self.p = columns
            .into_iter()
            .map(|sum| (sum / total + perturbation(self.noise, rng)).clamp(0.0, 1.0))
            .collect();
    }

    fn check(&self) -> EvoResult<()> {
        if self.n == 0 {
            return Err(ConfigError::invalid("n", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.default_p) {
            return Err(ConfigError::invalid("p", "must be in [0, 1]"));
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(ConfigError::invalid("noise", "must be finite and non-negative"));
        }
        Ok(())
    }
}

impl Schedulable for BinomialModel {}

impl Operator<Vec<usize>> for BinomialModel {
    fn name(&self) -> &str {
        "BinomialSample"
    }

    fn evolve(
        &self,
        individual: &Individual<Vec<usize>>,
        _ctx: &OperatorContext<'_, Vec<usize>>,
        rng: &mut dyn RngCore,
    ) -> Individual<Vec<usize>> {
        let genotype = (0..individual.genotype().len())
            .map(|i| self.draw(i, rng))
            .collect();
        Individual::new(genotype)
    }
}

impl Model<Vec<usize>> for BinomialModel {
    fn fit(&mut self, parents: &[Individual<Vec<usize>>], rng: &mut dyn RngCore) {
        let Some(first) = parents.first() else {
            return;
        };
        let mut columns = vec![0.0; first.genotype().len()];
        for parent in parents {
            for (acc, &x) in columns.iter_mut().zip(parent.genotype()) {
                *acc += x as f64;
            }
        }
        self.refit(columns, parents.len(), rng);
    }

    fn validate(&self) -> EvoResult<()> {
        self.check()
    }
}

impl Operator<Vec<bool>> for BinomialModel {
    fn name(&self) -> &str {
        "BernoulliSample"
    }

    fn evolve(
        &self,
        individual: &Individual<Vec<bool>>,
        _ctx: &OperatorContext<'_, Vec<bool>>,
        rng: &mut dyn RngCore,
    ) -> Individual<Vec<bool>> {
        let genotype = (0..individual.genotype().len())
            .map(|i| self.draw(i, rng) > 0)
            .collect();
        Individual::new(genotype)
    }
}

impl Model<Vec<bool>> for BinomialModel {
    fn fit(&mut self, parents: &[Individual<Vec<bool>>], rng: &mut dyn RngCore) {
        let Some(first) = parents.first() else {
            return;
        };
        let mut columns = vec![0.0; first.genotype().len()];
        for parent in parents {
            for (acc, &bit) in columns.iter_mut().zip(parent.genotype()) {
                if bit {
                    *acc += 1.0;
                }
            }
        }
        self.refit(columns, parents.len(), rng);
    }

    fn validate(&self) -> EvoResult<()> {
        self.check()?;
        if self.n != 1 {
            return Err(ConfigError::invalid("n", "must be 1 for bit vectors"));
        }
        Ok(())
    }
}

/// A [`VariablePopulation`] whose operator is a distribution refit to
/// the parents every generation.
pub struct Umda<G, M> {
    inner: VariablePopulation<G>,
    model: M,
}

impl<G: Genotype, M: Model<G>> Umda<G, M> {
    pub fn new(inner: VariablePopulation<G>, model: M) -> EvoResult<Self> {
        model.validate()?;
        Ok(Self { inner, model })
    }

    /// The model as of the last generation.
    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn n_offspring(&self) -> usize {
        self.inner.n_offspring()
    }
}

impl<G: Genotype, M: Model<G>> SearchStrategy<G> for Umda<G, M> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn state(&self) -> &SearchState<G> {
        self.inner.state()
    }

    fn state_mut(&mut self) -> &mut SearchState<G> {
        self.inner.state_mut()
    }

    fn initializer(&self) -> &dyn Initializer<G> {
        self.inner.initializer()
    }

    fn validate(&self) -> EvoResult<()> {
        self.inner.validate()?;
        self.model.validate()
    }

    fn select_parents(
        &mut self,
        population: &[Individual<G>],
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        self.inner.select_parents(population, rng)
    }

    fn perturb(
        &mut self,
        parents: &[Individual<G>],
        objective: &dyn Objective<G>,
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        self.model.fit(parents, rng);
        self.inner.set_operator(self.model.clone());
        self.inner.perturb(parents, objective, rng)
    }

    fn select_individuals(
        &mut self,
        population: Vec<Individual<G>>,
        offspring: Vec<Individual<G>>,
        rng: &mut dyn RngCore,
    ) -> Vec<Individual<G>> {
        self.inner.select_individuals(population, offspring, rng)
    }

    fn update_params(&mut self, progress: f64) {
        self.inner.update_params(progress);
    }

    fn extra(&self) -> Params {
        self.inner.extra()
    }
}

fn offspring_size(params: &Params, pop_size: usize) -> EvoResult<usize> {
    match params.get("offspringSize") {
        Some(_) => params.require_count("offspringSize"),
        None => Ok(pop_size),
    }
}

fn umda<G: Genotype, M: Model<G>>(
    initializer: impl Initializer<G> + 'static,
    model: M,
    parent_selection: ParentSelection,
    survivor_selection: SurvivorSelection,
    params: &Params,
    name: &str,
) -> EvoResult<Umda<G, M>> {
    let n_offspring = offspring_size(params, initializer.pop_size())?;
    let inner = VariablePopulation::new(initializer, model.clone())
        .with_name(name)
        .with_offspring(n_offspring)?
        .with_parent_selection(parent_selection)
        .with_survivor_selection(survivor_selection);
    Umda::new(inner, model)
}

/// Builds a Gaussian UMDA over real vectors, named `"GaussianUMDA"`.
///
/// Parameters: `loc` (0), `scale` (1), `noise` (0) and `offspringSize`
/// (the population size).
///
/// # Errors
/// Returns [`ConfigError::InvalidParameter`] for a negative `scale` or
/// `noise`, or a zero offspring count.
pub fn gaussian_umda(
    initializer: impl Initializer<Vec<f64>> + 'static,
    parent_selection: ParentSelection,
    survivor_selection: SurvivorSelection,
    params: &Params,
) -> EvoResult<Umda<Vec<f64>, GaussianModel>> {
    let model = GaussianModel::new(
        params.get_or("loc", 0.0),
        params.get_or("scale", 1.0),
        params.get_or("noise", 0.0),
    );
    umda(initializer, model, parent_selection, survivor_selection, params, "GaussianUMDA")
}

/// Builds a binomial UMDA, named `"BinomialUMDA"`.
///
/// Works on `Vec<usize>` counts in `0..=n` and on `Vec<bool>` (with
/// `n = 1`). Parameters: `n` (required), `p` (0.5), `noise` (0) and
/// `offspringSize` (the population size).
///
/// # Errors
/// Returns [`ConfigError::MissingParameter`] without `n`, and
/// [`ConfigError::InvalidParameter`] for out-of-range values.
pub fn binomial_umda<G>(
    initializer: impl Initializer<G> + 'static,
    parent_selection: ParentSelection,
    survivor_selection: SurvivorSelection,
    params: &Params,
) -> EvoResult<Umda<G, BinomialModel>>
where
    G: Genotype,
    BinomialModel: Model<G>,
{
    let model = BinomialModel::new(
        params.require_count("n")?,
        params.get_or("p", 0.5),
        params.get_or("noise", 0.0),
    );
    umda(initializer, model, parent_selection, survivor_selection, params, "BinomialUMDA")
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::core::Direction;
    use crate::random::create_rng;
    use crate::selection::{ParentMethod, SurvivorMethod};

    struct CountSum;

    impl Objective<Vec<usize>> for CountSum {
        fn direction(&self) -> Direction {
            Direction::Maximize
        }
        fn evaluate(&self, x: &Vec<usize>) -> f64 {
            x.iter().sum::<usize>() as f64
        }
        fn repair_solution(&self, x: Vec<usize>) -> Vec<usize> {
            x
        }
    }

    struct CountInit {
        len: usize,
        n: usize,
        pop_size: usize,
    }

    impl Initializer<Vec<usize>> for CountInit {
        fn pop_size(&self) -> usize {
            self.pop_size
        }
        fn set_pop_size(&mut self, size: usize) {
            self.pop_size = size;
        }
        fn generate_random(&self, rng: &mut dyn RngCore) -> Vec<usize> {
            (0..self.len).map(|_| rng.random_range(0..=self.n)).collect()
        }
    }

    fn real(genotype: &[f64]) -> Individual<Vec<f64>> {
        Individual::new(genotype.to_vec())
    }

    #[test]
    fn test_gaussian_refit_follows_parents() {
        let mut rng = create_rng(42);
        let params = Params::new().with("scale", 0.05).with("offspringSize", 200.0);
        let mut eda = gaussian_umda(
            UniformInit { dim: 2, pop_size: 10 },
            ParentSelection::default(),
            SurvivorSelection::default(),
            &params,
        )
        .unwrap();
        assert_eq!(eda.name(), "GaussianUMDA");
        assert_eq!(eda.n_offspring(), 200);
        eda.initialize(&Sphere, &mut rng);

        let parents = vec![real(&[2.0, -1.0]), real(&[4.0, -3.0]), real(&[3.0, -2.0])];
        let offspring = eda.perturb(&parents, &Sphere, &mut rng);

        assert_eq!(eda.model().loc(), &[3.0, -2.0]);
        assert_eq!(offspring.len(), 200);
        let mean = |i: usize| offspring.iter().map(|o| o.genotype()[i]).sum::<f64>() / 200.0;
        assert!((mean(0) - 3.0).abs() < 0.05, "mean x = {}", mean(0));
        assert!((mean(1) + 2.0).abs() < 0.05, "mean y = {}", mean(1));
        assert!(offspring.iter().all(Individual::is_evaluated));
    }

    #[test]
    fn test_gaussian_noise_moves_loc() {
        let mut rng = create_rng(7);
        let mut model = GaussianModel::new(0.0, 1.0, 0.5);
        model.fit(&[real(&[1.0, 1.0]), real(&[1.0, 1.0])], &mut rng);
        assert_eq!(model.loc().len(), 2);
        assert!(model.loc().iter().any(|&l| l != 1.0));

        let mut still = GaussianModel::new(0.0, 1.0, 0.0);
        still.fit(&[real(&[1.0, 1.0])], &mut rng);
        assert_eq!(still.loc(), &[1.0, 1.0]);
        still.fit(&[], &mut rng);
        assert_eq!(still.loc(), &[1.0, 1.0]);
    }

    #[test]
    fn test_gaussian_converges_on_sphere() {
        let mut rng = create_rng(42);
        let mut eda = gaussian_umda(
            UniformInit { dim: 2, pop_size: 30 },
            ParentSelection::new(ParentMethod::Best { amount: 10 }),
            SurvivorSelection::new(SurvivorMethod::PlusSelection),
            &Params::new().with("scale", 0.5),
        )
        .unwrap();
        eda.initialize(&Sphere, &mut rng);
        for g in 0..40 {
            eda.step(&Sphere, g as f64 / 40.0, &mut rng);
        }
        let best = eda.state().best().unwrap().fitness();
        assert!(best > -0.5, "expected near the origin, got {best}");
    }

    #[test]
    fn test_binomial_refit_follows_parents() {
        let mut rng = create_rng(42);
        let mut eda = binomial_umda(
            CountInit { len: 3, n: 4, pop_size: 6 },
            ParentSelection::default(),
            SurvivorSelection::default(),
            &Params::new().with("n", 4.0),
        )
        .unwrap();
        assert_eq!(eda.name(), "BinomialUMDA");
        eda.initialize(&CountSum, &mut rng);

        let parents = vec![Individual::new(vec![4, 0, 2]), Individual::new(vec![4, 0, 2])];
        let offspring = eda.perturb(&parents, &CountSum, &mut rng);

        assert_eq!(eda.model().p(), &[1.0, 0.0, 0.5]);
        assert_eq!(offspring.len(), 6);
        for child in &offspring {
            let genes = child.genotype();
            assert_eq!(genes[0], 4);
            assert_eq!(genes[1], 0);
            assert!(genes[2] <= 4);
        }
    }

    #[test]
    fn test_binomial_noise_is_clipped() {
        let mut rng = create_rng(3);
        let mut model = BinomialModel::new(2, 0.5, 5.0);
        let parents = vec![Individual::new(vec![2usize, 0, 1]); 4];
        for _ in 0..20 {
            Model::<Vec<usize>>::fit(&mut model, &parents, &mut rng);
            assert!(model.p().iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_binomial_on_bits() {
        let mut rng = create_rng(42);
        let mut eda = binomial_umda(
            BitInit { len: 5, pop_size: 8 },
            ParentSelection::default(),
            SurvivorSelection::default(),
            &Params::new().with("n", 1.0),
        )
        .unwrap();
        eda.initialize(&OneMax, &mut rng);
        let parents = vec![Individual::new(vec![true, false, true, true, false]); 3];
        let offspring = eda.perturb(&parents, &OneMax, &mut rng);
        for child in &offspring {
            assert_eq!(child.genotype(), &vec![true, false, true, true, false]);
        }
    }

    #[test]
    fn test_binomial_requires_n() {
        let result = binomial_umda::<Vec<usize>>(
            CountInit { len: 3, n: 4, pop_size: 6 },
            ParentSelection::default(),
            SurvivorSelection::default(),
            &Params::new().with("p", 0.3),
        );
        assert!(matches!(result, Err(ConfigError::MissingParameter(ref key)) if key == "n"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let bits = binomial_umda(
            BitInit { len: 5, pop_size: 8 },
            ParentSelection::default(),
            SurvivorSelection::default(),
            &Params::new().with("n", 3.0),
        );
        assert!(bits.is_err());

        let scale = gaussian_umda(
            UniformInit { dim: 2, pop_size: 8 },
            ParentSelection::default(),
            SurvivorSelection::default(),
            &Params::new().with("scale", -1.0),
        );
        assert!(scale.is_err());

        let offspring = gaussian_umda(
            UniformInit { dim: 2, pop_size: 8 },
            ParentSelection::default(),
            SurvivorSelection::default(),
            &Params::new().with("offspringSize", 0.0),
        );
        assert!(offspring.is_err());
    }
}
