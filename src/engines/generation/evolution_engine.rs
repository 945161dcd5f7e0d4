use crate::config::{ConfigSection, EvolutionConfig};
use crate::data::Dataset;
use crate::engines::evaluation::{evaluate_population, FitnessCache};
use crate::engines::expression::ExprTree;
use crate::engines::generation::{
    crossover::crossover,
    hall_of_fame::{EliteExpression, HallOfFame},
    mutation::mutate,
    pareto::multi_objective_selection,
    population::deduplicate,
    random_tree::{generate_random_tree, initialize_population},
    simplify::simplify,
};
use crate::error::{Result, SymregError};
use crate::types::Objectives;
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::Rng;
use rand::SeedableRng;

/// Expressions kept in the hall of fame across a run.
pub const HALL_OF_FAME_SIZE: usize = 50;

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_population_evaluated(&mut self, generation: usize, population_size: usize);
    fn on_generation_complete(
        &mut self,
        generation: usize,
        best_mse: f64,
        hall_of_fame_size: usize,
    );
}

impl<C: ProgressCallback + ?Sized> ProgressCallback for &mut C {
    fn on_generation_start(&mut self, generation: usize) {
        (**self).on_generation_start(generation);
    }

    fn on_population_evaluated(&mut self, generation: usize, population_size: usize) {
        (**self).on_population_evaluated(generation, population_size);
    }

    fn on_generation_complete(
        &mut self,
        generation: usize,
        best_mse: f64,
        hall_of_fame_size: usize,
    ) {
        (**self).on_generation_complete(generation, best_mse, hall_of_fame_size);
    }
}

#[derive(Debug, Clone)]
pub struct EvolutionResult {
    /// Best expression seen in any generation.
    pub best: ExprTree,
    pub best_objectives: Objectives,
    /// `history[g]`: best error seen up to and including generation `g`.
    pub history: Vec<f64>,
    pub hall_of_fame: Vec<EliteExpression>,
    pub generations_run: usize,
}

pub struct EvolutionEngine {
    config: EvolutionConfig,
    hall_of_fame: HallOfFame,
    rng: StdRng,
}

impl EvolutionEngine {
    pub fn new(config: EvolutionConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            hall_of_fame: HallOfFame::new(HALL_OF_FAME_SIZE),
            rng,
        })
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Run the evolution process
    pub fn run<C: ProgressCallback>(
        &mut self,
        dataset: &Dataset,
        mut callback: C,
    ) -> Result<EvolutionResult> {
        // The archive only describes this run's dataset.
        self.hall_of_fame = HallOfFame::new(HALL_OF_FAME_SIZE);

        let n_variables = dataset.n_variables();
        let mut population = initialize_population(
            self.config.population_size,
            n_variables,
            self.config.max_depth,
            &mut self.rng,
        );

        let mut best: Option<(ExprTree, Objectives)> = None;
        let mut history = Vec::with_capacity(self.config.generations);
        let mut previous_generation_best: Option<f64> = None;
        let mut gens_without_improvement = 0;
        let mut generations_run = 0;

        for generation in 0..self.config.generations {
            callback.on_generation_start(generation);

            // Predictions are only reused within a generation.
            let cache = FitnessCache::new();
            let objectives = evaluate_population(&population, dataset, &cache);
            callback.on_population_evaluated(generation, population.len());
            log::trace!(
                "Generation {}: cache hits {}, misses {}",
                generation + 1,
                cache.hits(),
                cache.misses()
            );
            drop(cache);

            let mut ranked: Vec<usize> = (0..population.len()).collect();
            ranked.sort_by(|&a, &b| objectives[a].lexicographic_cmp(&objectives[b]));
            let leader = *ranked.first().ok_or_else(|| {
                SymregError::Configuration("Population became empty".to_string())
            })?;
            let generation_best = objectives[leader];

            if previous_generation_best == Some(generation_best.mse) {
                gens_without_improvement += 1;
            } else {
                gens_without_improvement = 0;
            }
            previous_generation_best = Some(generation_best.mse);

            let improved = best
                .as_ref()
                .map_or(true, |(_, o)| generation_best.lexicographic_cmp(o).is_lt());
            if improved {
                best = Some((population[leader].clone(), generation_best));
            }
            let best_mse = best.as_ref().map_or(f64::INFINITY, |(_, o)| o.mse);
            history.push(best_mse);

            self.hall_of_fame.update(&population, &objectives, generation);
            generations_run = generation + 1;
            callback.on_generation_complete(generation, best_mse, self.hall_of_fame.len());

            if best_mse < self.config.target_mse {
                log::info!(
                    "Target error reached in generation {}: {:.6e}",
                    generation + 1,
                    best_mse
                );
                break;
            }
            if generation + 1 == self.config.generations {
                break;
            }

            let restart = gens_without_improvement > self.config.max_no_improvement;
            population = if restart {
                log::debug!(
                    "No improvement for {} generations, restarting population",
                    gens_without_improvement
                );
                gens_without_improvement = 0;
                self.restart_population(&population, &ranked, n_variables)
            } else {
                self.create_next_generation(&population, &objectives, &ranked, n_variables)?
            };
        }

        let (best, best_objectives) = best.ok_or_else(|| {
            SymregError::Configuration("No generation was evaluated".to_string())
        })?;

        Ok(EvolutionResult {
            best,
            best_objectives,
            history,
            hall_of_fame: self.hall_of_fame.get_all().to_vec(),
            generations_run,
        })
    }

    /// Simplified copies of the best `elitism_size` individuals.
    fn elites(&self, population: &[ExprTree], ranked: &[usize]) -> Vec<ExprTree> {
        if !self.config.elitism {
            return Vec::new();
        }
        ranked
            .iter()
            .take(self.config.elitism_size)
            .map(|&i| simplify(&population[i]))
            .collect()
    }

    /// Elites plus ranked survivors up to the survivor share, the rest random.
    fn restart_population(
        &mut self,
        population: &[ExprTree],
        ranked: &[usize],
        n_variables: usize,
    ) -> Vec<ExprTree> {
        let mut next_generation = self.elites(population, ranked);
        let survivors = self.config.survivor_count();
        if next_generation.len() < survivors {
            next_generation.extend(
                ranked
                    .iter()
                    .skip(next_generation.len())
                    .take(survivors - next_generation.len())
                    .map(|&i| population[i].clone()),
            );
        }
        self.refill(&mut next_generation, n_variables);
        next_generation
    }

    fn create_next_generation(
        &mut self,
        population: &[ExprTree],
        objectives: &[Objectives],
        ranked: &[usize],
        n_variables: usize,
    ) -> Result<Vec<ExprTree>> {
        let population_size = self.config.population_size;
        let pool = multi_objective_selection(objectives, self.config.breeding_pool_size());
        if pool.is_empty() {
            return Err(SymregError::Configuration(
                "Breeding pool is empty".to_string(),
            ));
        }

        let mut next_generation = self.elites(population, ranked);

        // Generate offspring
        while next_generation.len() < population_size {
            if pool.len() >= 2 && self.rng.gen::<f64>() < self.config.crossover_rate {
                let picks = index::sample(&mut self.rng, pool.len(), 2);
                let parent1 = &population[pool[picks.index(0)]];
                let parent2 = &population[pool[picks.index(1)]];
                let (child1, child2) = crossover(parent1, parent2, &mut self.rng)?;
                next_generation.push(simplify(&child1));
                next_generation.push(simplify(&child2));
            } else {
                let parent = pool
                    .choose(&mut self.rng)
                    .map(|&i| &population[i])
                    .ok_or_else(|| {
                        SymregError::Configuration("Breeding pool is empty".to_string())
                    })?;
                let mutant = mutate(
                    parent,
                    self.config.max_depth,
                    self.config.mutation_rate,
                    n_variables,
                    &mut self.rng,
                )?;
                next_generation.push(simplify(&mutant));
            }
        }

        let mut next_generation = deduplicate(next_generation);

        if self.rng.gen::<f64>() < self.config.random_trim_probability {
            log::debug!("Trimming next generation to {}", self.config.survivor_count());
            next_generation.truncate(self.config.survivor_count());
        }

        self.refill(&mut next_generation, n_variables);
        Ok(next_generation)
    }

    /// Tops up with random trees and cuts back to the population size.
    fn refill(&mut self, next_generation: &mut Vec<ExprTree>, n_variables: usize) {
        let population_size = self.config.population_size;
        while next_generation.len() < population_size {
            next_generation.push(generate_random_tree(
                self.config.max_depth,
                n_variables,
                0,
                &mut self.rng,
            ));
        }
        next_generation.truncate(population_size);
    }

    pub fn get_hall_of_fame(&self) -> &HallOfFame {
        &self.hall_of_fame
    }
}
