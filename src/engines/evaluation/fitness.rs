use crate::data::Dataset;
use crate::engines::expression::{ExprTree, TreeId};
use crate::types::Objectives;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Predictions are clipped to this magnitude before the error is computed.
pub const PREDICTION_CLIP: f64 = 1e10;

/// Memoized predictions keyed by (tree identity, row index).
///
/// One cache serves a single generation: the engine creates it before
/// evaluating and drops it afterwards. Clones of a tree carry a new
/// [`TreeId`] and therefore never share entries.
#[derive(Debug, Default)]
pub struct FitnessCache {
    entries: Mutex<HashMap<(TreeId, usize), f64>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl FitnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tree: TreeId, row: usize) -> Option<f64> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&(tree, row)).copied()
    }

    pub fn insert(&self, tree: TreeId, row: usize, value: f64) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert((tree, row), value);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Prediction of `individual` on one dataset row, through the cache.
pub fn evaluate_individual(
    cache: &FitnessCache,
    individual: &ExprTree,
    dataset: &Dataset,
    row: usize,
) -> f64 {
    if let Some(value) = cache.get(individual.id(), row) {
        cache.hits.fetch_add(1, Ordering::Relaxed);
        return value;
    }
    cache.misses.fetch_add(1, Ordering::Relaxed);
    let value = individual.evaluate(dataset.row(row));
    cache.insert(individual.id(), row, value);
    value
}

/// Mean squared error over every row (predictions clipped to
/// `±PREDICTION_CLIP`) and node count. An undefined error becomes `INFINITY`.
///
/// The result carries no reference to `individual`; callers scoring a pool
/// keep the pairing themselves, either by index through
/// [`evaluate_population`] or as `(individual, objectives)` tuples through
/// [`score_population`].
pub fn get_objectives(
    individual: &ExprTree,
    dataset: &Dataset,
    cache: &FitnessCache,
) -> Objectives {
    let squared_error: f64 = (0..dataset.len())
        .map(|row| {
            let prediction = evaluate_individual(cache, individual, dataset, row)
                .clamp(-PREDICTION_CLIP, PREDICTION_CLIP);
            let diff = prediction - dataset.target(row);
            diff * diff
        })
        .sum();

    let mse = squared_error / dataset.len() as f64;
    let mse = if mse.is_nan() { f64::INFINITY } else { mse };
    Objectives::new(mse, individual.len())
}

/// Evaluates every individual in parallel; `result[i]` belongs to `population[i]`.
pub fn evaluate_population(
    population: &[ExprTree],
    dataset: &Dataset,
    cache: &FitnessCache,
) -> Vec<Objectives> {
    population
        .par_iter()
        .map(|individual| get_objectives(individual, dataset, cache))
        .collect()
}

/// Like [`evaluate_population`], but each score travels with the individual
/// it was computed for. Order follows `population`.
pub fn score_population<'a>(
    population: &'a [ExprTree],
    dataset: &Dataset,
    cache: &FitnessCache,
) -> Vec<(&'a ExprTree, Objectives)> {
    population
        .par_iter()
        .map(|individual| (individual, get_objectives(individual, dataset, cache)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::expression::Op;

    fn linear_dataset() -> Dataset {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        Dataset::from_fn(x, |row| 2.0 * row[0] + 1.0).unwrap()
    }

    fn linear() -> ExprTree {
        let scaled =
            ExprTree::binary(Op::Mul, &ExprTree::constant(2.0), &ExprTree::variable(0)).unwrap();
        ExprTree::binary(Op::Add, &scaled, &ExprTree::constant(1.0)).unwrap()
    }

    #[test]
    fn test_exact_fit_has_zero_error() {
        let cache = FitnessCache::new();
        let objectives = get_objectives(&linear(), &linear_dataset(), &cache);
        assert_eq!(objectives.mse, 0.0);
        assert_eq!(objectives.complexity, 5);
    }

    #[test]
    fn test_mse_of_constant_model() {
        let dataset = Dataset::new(vec![vec![0.0], vec![1.0]], vec![1.0, 3.0]).unwrap();
        let cache = FitnessCache::new();
        let objectives = get_objectives(&ExprTree::constant(2.0), &dataset, &cache);
        assert!((objectives.mse - 1.0).abs() < 1e-12);
        assert_eq!(objectives.complexity, 1);
    }

    #[test]
    fn test_cache_hits_on_same_tree_only() {
        let dataset = linear_dataset();
        let cache = FitnessCache::new();
        let tree = linear();

        get_objectives(&tree, &dataset, &cache);
        assert_eq!(cache.misses(), 10);
        assert_eq!(cache.hits(), 0);

        get_objectives(&tree, &dataset, &cache);
        assert_eq!(cache.hits(), 10);

        // A clone is a distinct individual.
        get_objectives(&tree.clone(), &dataset, &cache);
        assert_eq!(cache.misses(), 20);
        assert_eq!(cache.len(), 20);
    }

    #[test]
    fn test_overflow_is_clipped() {
        // exp(exp(x_0)) overflows for moderate inputs
        let inner = ExprTree::unary(Op::Exp, &ExprTree::variable(0)).unwrap();
        let tree = ExprTree::unary(Op::Exp, &inner).unwrap();
        let dataset = Dataset::new(vec![vec![10.0]], vec![0.0]).unwrap();
        let objectives = get_objectives(&tree, &dataset, &FitnessCache::new());
        assert!(objectives.mse.is_finite());
        assert!((objectives.mse - PREDICTION_CLIP * PREDICTION_CLIP).abs() < 1.0e6);
    }

    #[test]
    fn test_evaluate_population_preserves_order() {
        let dataset = linear_dataset();
        let population = vec![linear(), ExprTree::constant(0.0), ExprTree::variable(0)];
        let cache = FitnessCache::new();
        let objectives = evaluate_population(&population, &dataset, &cache);

        assert_eq!(objectives.len(), 3);
        assert_eq!(objectives[0].mse, 0.0);
        assert_eq!(objectives[1].complexity, 1);
        assert!(objectives[1].mse > objectives[2].mse);
    }

    #[test]
    fn test_scored_population_keeps_pairs() {
        let dataset = linear_dataset();
        let population = vec![ExprTree::variable(0), linear(), ExprTree::constant(0.0)];
        let cache = FitnessCache::new();
        let scored = score_population(&population, &dataset, &cache);

        assert_eq!(scored.len(), population.len());
        for ((individual, objectives), original) in scored.iter().zip(&population) {
            assert_eq!(individual.id(), original.id());
            assert_eq!(*objectives, get_objectives(original, &dataset, &cache));
        }
        assert_eq!(scored[1].1.mse, 0.0);
    }
}
