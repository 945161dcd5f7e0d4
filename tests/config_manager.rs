use std::io::Write;
use symreg::config::{ConfigManager, EvolutionConfig};

#[test]
fn test_save_and_reload_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("symreg.toml");

    let manager = ConfigManager::new();
    manager
        .update(|c| {
            c.evolution.population_size = 120;
            c.evolution.crossover_rate = 0.55;
            c.evolution.seed = Some(7);
        })
        .unwrap();
    manager.save_to_file(&path).unwrap();

    let reloaded = ConfigManager::new();
    reloaded.load_from_file(&path).unwrap();
    assert_eq!(reloaded.get(), manager.get());
}

#[test]
fn test_partial_file_uses_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[evolution]\ngenerations = 25\nmax_depth = 3").unwrap();

    let manager = ConfigManager::new();
    manager.load_from_file(file.path()).unwrap();
    let config = manager.get().evolution;
    assert_eq!(config.generations, 25);
    assert_eq!(config.max_depth, 3);
    assert_eq!(config.population_size, EvolutionConfig::default().population_size);
}

#[test]
fn test_invalid_file_is_rejected() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[evolution]\nmutation_rate = 2.5").unwrap();

    let manager = ConfigManager::new();
    assert!(manager.load_from_file(file.path()).is_err());
    // The previous configuration stays in place.
    assert_eq!(manager.get().evolution.mutation_rate, 0.8);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ConfigManager::new();
    assert!(manager.load_from_file(dir.path().join("absent.toml")).is_err());
}
