use anyhow::Context;
use symreg::config::ConfigManager;
use symreg::data::Dataset;
use symreg::engines::generation::{EvolutionEngine, LogProgressCallback};

fn main() -> anyhow::Result<()> {
    // RUST_LOG controls verbosity
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let manager = ConfigManager::new();
    if let Some(path) = std::env::args().nth(1) {
        manager
            .load_from_file(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?;
    } else {
        manager
            .load_from_env()
            .context("Failed to apply environment overrides")?;
    }
    let config = manager.get().evolution;

    // Demo problem: y = 2 * x_0 + 1 on [-5, 5)
    let x: Vec<Vec<f64>> = (0..50).map(|i| vec![-5.0 + 0.2 * i as f64]).collect();
    let dataset = Dataset::from_fn(x, |row| 2.0 * row[0] + 1.0)?;

    log::info!(
        "Evolving {} expressions for up to {} generations on {} rows",
        config.population_size,
        config.generations,
        dataset.len()
    );

    let mut engine = EvolutionEngine::new(config)?;
    let result = engine.run(&dataset, LogProgressCallback)?;

    println!(
        "Best expression: {} (MSE = {:.6e}, complexity = {})",
        result.best, result.best_objectives.mse, result.best_objectives.complexity
    );
    println!("Generations run: {}", result.generations_run);
    println!("Hall of Fame:");
    for elite in result.hall_of_fame.iter().take(10) {
        println!(
            "  rank {} | MSE {:.6e} | size {:>3} | {}",
            elite.pareto_rank,
            elite.objectives.mse,
            elite.objectives.complexity,
            elite.canonical_string
        );
    }

    Ok(())
}
