use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::{Result, SymregError};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Depth attribute at and beyond which generated nodes are terminals.
    pub max_depth: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub elitism: bool,
    pub elitism_size: usize,
    /// Generations with an unchanged best error tolerated before a restart.
    pub max_no_improvement: usize,
    /// Evolution stops once the best error falls below this.
    pub target_mse: f64,
    /// Breeding pool size as a fraction of the population.
    pub breeding_pool_fraction: f64,
    pub random_trim_probability: f64,
    /// Share of the population kept by random trims and stagnation restarts.
    pub survivor_fraction: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 500,
            generations: 1000,
            max_depth: 5,
            crossover_rate: 0.4,
            mutation_rate: 0.8,
            elitism: true,
            elitism_size: 10,
            max_no_improvement: 5,
            target_mse: 1e-4,
            breeding_pool_fraction: 1.0,
            random_trim_probability: 0.2,
            survivor_fraction: 0.6,
            seed: None,
        }
    }
}

impl EvolutionConfig {
    pub fn survivor_count(&self) -> usize {
        (self.population_size as f64 * self.survivor_fraction) as usize
    }

    pub fn breeding_pool_size(&self) -> usize {
        ((self.population_size as f64 * self.breeding_pool_fraction).round() as usize)
            .clamp(1, self.population_size)
    }
}

fn check_rate(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SymregError::Configuration(format!(
            "{} must be between 0 and 1, got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(SymregError::Configuration(format!(
            "{} must be in (0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(SymregError::Configuration(
                "Population size must be at least 2".to_string(),
            ));
        }
        if self.generations == 0 {
            return Err(SymregError::Configuration(
                "At least one generation is required".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(SymregError::Configuration(
                "Max depth must be at least 1".to_string(),
            ));
        }
        check_rate("Crossover rate", self.crossover_rate)?;
        check_rate("Mutation rate", self.mutation_rate)?;
        check_rate("Random trim probability", self.random_trim_probability)?;
        check_fraction("Breeding pool fraction", self.breeding_pool_fraction)?;
        check_fraction("Survivor fraction", self.survivor_fraction)?;
        if self.elitism && self.elitism_size >= self.population_size {
            return Err(SymregError::Configuration(format!(
                "Elitism size {} must be smaller than the population ({})",
                self.elitism_size, self.population_size
            )));
        }
        if self.target_mse.is_nan() || self.target_mse < 0.0 {
            return Err(SymregError::Configuration(
                "Target MSE must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Evolution".to_string(),
            fields: vec![
                FieldManifest::new(
                    "population_size",
                    "integer",
                    json!(self.population_size),
                    "Number of expressions in the population",
                )
                .with_range(2.0, 100_000.0),
                FieldManifest::new(
                    "generations",
                    "integer",
                    json!(self.generations),
                    "Maximum number of generations",
                )
                .with_range(1.0, 1_000_000.0),
                FieldManifest::new(
                    "max_depth",
                    "integer",
                    json!(self.max_depth),
                    "Depth limit for generated subtrees",
                )
                .with_range(1.0, 32.0),
                FieldManifest::new(
                    "crossover_rate",
                    "float",
                    json!(self.crossover_rate),
                    "Chance an offspring comes from crossover",
                )
                .with_range(0.0, 1.0),
                FieldManifest::new(
                    "mutation_rate",
                    "float",
                    json!(self.mutation_rate),
                    "Chance a selected individual is mutated",
                )
                .with_range(0.0, 1.0),
                FieldManifest::new(
                    "elitism",
                    "boolean",
                    json!(self.elitism),
                    "Carry the best expressions over unchanged",
                ),
                FieldManifest::new(
                    "elitism_size",
                    "integer",
                    json!(self.elitism_size),
                    "Number of elites carried over",
                ),
                FieldManifest::new(
                    "max_no_improvement",
                    "integer",
                    json!(self.max_no_improvement),
                    "Stagnant generations before a restart",
                ),
                FieldManifest::new(
                    "target_mse",
                    "float",
                    json!(self.target_mse),
                    "Error below which evolution stops",
                ),
                FieldManifest::new(
                    "breeding_pool_fraction",
                    "float",
                    json!(self.breeding_pool_fraction),
                    "Breeding pool size relative to the population",
                )
                .with_range(0.0, 1.0),
                FieldManifest::new(
                    "random_trim_probability",
                    "float",
                    json!(self.random_trim_probability),
                    "Chance of trimming the next generation",
                )
                .with_range(0.0, 1.0),
                FieldManifest::new(
                    "survivor_fraction",
                    "float",
                    json!(self.survivor_fraction),
                    "Share kept by trims and restarts",
                )
                .with_range(0.0, 1.0),
                FieldManifest::new(
                    "seed",
                    "integer",
                    json!(self.seed),
                    "Random seed; empty for a random run",
                ),
            ],
        }
    }
}
