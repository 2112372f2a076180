//! Property-based tests for u-evosearch
//!
//! Uses proptest to verify invariants of selection, reef dynamics,
//! operator weighting and the search loop.

use proptest::prelude::*;
use rand::{Rng, RngCore};
use u_evosearch::core::{
    Direction, FnOperator, Individual, Initializer, Objective, Operator, OperatorContext, Params,
};
use u_evosearch::cro::{operator_probability, CroConfig, CroSl, DynamicConfig, Reef, REEF_FLOOR};
use u_evosearch::random::create_rng;
use u_evosearch::runner::{SearchConfig, SearchRunner};
use u_evosearch::selection::{
    comma_selection, cond_elitism, cro_selection, elitism, one_to_one, plus_selection,
    prob_one_to_one,
};
use u_evosearch::strategy::SearchStrategy;

// ==================== Fixtures ====================

fn population(fitness: &[f64]) -> Vec<Individual<usize>> {
    fitness
        .iter()
        .enumerate()
        .map(|(i, &f)| {
            let mut ind = Individual::new(i);
            ind.set_fitness(f);
            ind
        })
        .collect()
}

fn fitness_of(pop: &[Individual<usize>]) -> Vec<f64> {
    pop.iter().map(Individual::fitness).collect()
}

fn max_fitness(pop: &[Individual<usize>]) -> f64 {
    pop.iter().map(Individual::fitness).fold(f64::NEG_INFINITY, f64::max)
}

struct Sphere;

impl Objective<Vec<f64>> for Sphere {
    fn direction(&self) -> Direction {
        Direction::Minimize
    }

    fn evaluate(&self, x: &Vec<f64>) -> f64 {
        x.iter().map(|v| v * v).sum()
    }

    fn repair_solution(&self, x: Vec<f64>) -> Vec<f64> {
        x.into_iter().map(|v| v.clamp(-5.0, 5.0)).collect()
    }
}

struct Init {
    pop_size: usize,
}

impl Initializer<Vec<f64>> for Init {
    fn pop_size(&self) -> usize {
        self.pop_size
    }

    fn set_pop_size(&mut self, size: usize) {
        self.pop_size = size;
    }

    fn generate_random(&self, rng: &mut dyn RngCore) -> Vec<f64> {
        (0..3).map(|_| rng.random_range(-5.0..5.0)).collect()
    }
}

type RealOp = fn(
    &Individual<Vec<f64>>,
    &OperatorContext<'_, Vec<f64>>,
    &Params,
    &mut dyn RngCore,
) -> Individual<Vec<f64>>;

fn jitter(
    ind: &Individual<Vec<f64>>,
    _ctx: &OperatorContext<'_, Vec<f64>>,
    params: &Params,
    rng: &mut dyn RngCore,
) -> Individual<Vec<f64>> {
    let f = params.get_or("F", 0.5);
    Individual::new(ind.genotype().iter().map(|v| v + rng.random_range(-f..f)).collect())
}

fn pool() -> Vec<Box<dyn Operator<Vec<f64>>>> {
    vec![
        Box::new(FnOperator::new("Fine", Params::new().with("F", 0.05), jitter as RealOp)),
        Box::new(FnOperator::new("Coarse", Params::new().with("F", 1.0), jitter as RealOp)),
    ]
}

fn fitness_vec(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-100.0..100.0f64, 1..max_len)
}

proptest! {
    // ==================== Reef Properties ====================

    #[test]
    fn depredation_respects_floor(
        fitness in fitness_vec(40),
        fd in 0.0..=1.0f64,
        pd in 0.0..=1.0f64,
        seed in any::<u64>()
    ) {
        let mut rng = create_rng(seed);
        let len = fitness.len();
        let mut reef = Reef::from_population(population(&fitness), len);
        let dead = reef.depredate(fd, pd, &mut rng);

        prop_assert_eq!(reef.len() + dead, len);
        prop_assert!(reef.len() >= len.min(REEF_FLOOR));
        prop_assert!(dead <= (len as f64 * fd).floor() as usize);
    }

    #[test]
    fn settling_never_exceeds_capacity(
        corals in fitness_vec(20),
        larvae in fitness_vec(40),
        extra in 0usize..20,
        attempts in 1usize..5,
        seed in any::<u64>()
    ) {
        let mut rng = create_rng(seed);
        let capacity = corals.len() + extra;
        let mut reef = Reef::from_population(population(&corals), capacity);
        let settled = reef.settle_all(population(&larvae), attempts, &mut rng);

        prop_assert_eq!(settled.len(), larvae.len());
        prop_assert!(reef.len() <= capacity);
        prop_assert!(reef.len() >= corals.len());
        // every settled larva either appended or replaced someone
        let appended = reef.len() - corals.len();
        prop_assert!(settled.iter().filter(|&&s| s).count() >= appended);
    }

    #[test]
    fn first_larva_always_settles_on_empty_reef(
        fitness in -100.0..100.0f64,
        capacity in 1usize..50,
        seed in any::<u64>()
    ) {
        let mut rng = create_rng(seed);
        let mut reef: Reef<usize> = Reef::new(capacity);
        prop_assert!(reef.settle(population(&[fitness]).remove(0), 1, &mut rng));
        prop_assert_eq!(reef.len(), 1);
    }

    #[test]
    fn cro_selection_stays_within_bounds(
        corals in fitness_vec(20),
        larvae in fitness_vec(40),
        extra in 0usize..10,
        fd in 0.0..=1.0f64,
        pd in 0.0..=1.0f64,
        seed in any::<u64>()
    ) {
        let mut rng = create_rng(seed);
        let capacity = corals.len() + extra;
        let next = cro_selection(population(&corals), population(&larvae), fd, pd, 3, capacity, &mut rng);

        prop_assert!(next.len() <= capacity);
        prop_assert!(next.len() >= corals.len().min(REEF_FLOOR));
    }

    // ==================== Survivor Selection Properties ====================

    #[test]
    fn survivor_methods_keep_population_size(
        parents in fitness_vec(30),
        children in fitness_vec(30),
        amount in 0usize..10
    ) {
        let n = parents.len();
        prop_assert_eq!(one_to_one(population(&parents), population(&children)).len(), n);
        prop_assert_eq!(elitism(population(&parents), population(&children), amount).len(), n);
        prop_assert_eq!(cond_elitism(population(&parents), population(&children), amount).len(), n);
        prop_assert_eq!(plus_selection(population(&parents), population(&children)).len(), n);
        prop_assert_eq!(comma_selection(population(&parents), population(&children)).len(), n);
    }

    #[test]
    fn plus_selection_keeps_overall_best(
        parents in fitness_vec(30),
        children in fitness_vec(30)
    ) {
        let best = max_fitness(&population(&parents)).max(max_fitness(&population(&children)));
        let next = plus_selection(population(&parents), population(&children));
        prop_assert_eq!(max_fitness(&next), best);
    }

    #[test]
    fn one_to_one_never_worsens_a_slot(
        parents in fitness_vec(30),
        children in fitness_vec(30)
    ) {
        let next = one_to_one(population(&parents), population(&children));
        for (kept, parent) in next.iter().zip(&parents) {
            prop_assert!(kept.fitness() >= *parent);
        }
    }

    #[test]
    fn prob_one_to_one_with_zero_probability_is_identity(
        parents in fitness_vec(30),
        children in fitness_vec(30),
        seed in any::<u64>()
    ) {
        let mut rng = create_rng(seed);
        let next = prob_one_to_one(population(&parents), population(&children), 0.0, &mut rng);
        prop_assert_eq!(fitness_of(&next), parents);
    }

    #[test]
    fn elitism_keeps_best_parent(
        parents in fitness_vec(30),
        children in fitness_vec(30),
        amount in 1usize..10
    ) {
        let best = max_fitness(&population(&parents));
        let next = elitism(population(&parents), population(&children), amount);
        prop_assert!(max_fitness(&next) >= best);
    }

    // ==================== Operator Weighting Properties ====================

    #[test]
    fn operator_probability_is_a_distribution(
        values in prop::collection::vec(-1e6..1e6f64, 1..12),
        prob_amp in 0.001..=1.0f64
    ) {
        let n = values.len();
        let p = operator_probability(&values, prob_amp);
        let floor = 0.02 / n as f64;

        prop_assert_eq!(p.len(), n);
        prop_assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        for &x in &p {
            prop_assert!(x.is_finite());
            prop_assert!(x >= floor - 1e-12);
        }
    }

    #[test]
    fn operator_probability_tolerates_non_finite(
        values in prop::collection::vec(prop_oneof![
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            -10.0..10.0f64,
        ], 1..8)
    ) {
        let p = operator_probability(&values, 0.1);
        prop_assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        prop_assert!(p.iter().all(|x| x.is_finite() && *x > 0.0));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // ==================== Search Loop Properties ====================

    #[test]
    fn best_never_worsens(seed in any::<u64>(), dynamic in any::<bool>()) {
        let mut cro = if dynamic {
            CroSl::dynamic(Init { pop_size: 20 }, pool(), CroConfig::default(), DynamicConfig::default().with_steps(5))
        } else {
            CroSl::probabilistic(Init { pop_size: 20 }, pool(), CroConfig::default())
        }
        .unwrap();
        let config = SearchConfig::default().with_max_generations(15).with_seed(seed);
        let result = SearchRunner::run(&mut cro, &Sphere, &config).unwrap();

        for pair in result.fitness_history.windows(2) {
            prop_assert!(pair[1] <= pair[0]);
        }
        prop_assert!((Sphere.evaluate(result.best.genotype()) - result.best_objective).abs() < 1e-12);
    }

    #[test]
    fn reef_size_stays_within_bounds(
        seed in any::<u64>(),
        fd in 0.0..=1.0f64,
        pd in 0.0..=1.0f64
    ) {
        let config = CroConfig::default().with_depredation(fd, pd);
        let mut cro = CroSl::new(Init { pop_size: 20 }, pool(), config).unwrap();
        let capacity = cro.capacity();
        let mut rng = create_rng(seed);

        cro.initialize(&Sphere, &mut rng);
        prop_assert_eq!(cro.state().population().len(), capacity);
        for g in 0..20 {
            let outcome = cro.step(&Sphere, g as f64 / 20.0, &mut rng);
            prop_assert!(outcome.population.len() >= REEF_FLOOR);
            prop_assert!(outcome.population.len() <= capacity);
        }
    }
}
