use super::{evolution::EvolutionConfig, traits::ConfigSection};
use crate::error::{Result, SymregError};
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix of environment overrides, e.g. `SYMREG_EVOLUTION__POPULATION_SIZE`.
pub const ENV_PREFIX: &str = "SYMREG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.evolution.validate()?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    /// Loads a TOML or JSON file (by extension) with `SYMREG_*` environment
    /// variables layered on top.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let source = Config::builder()
            .add_source(File::from(path.as_ref()).required(true))
            .add_source(environment())
            .build()?;

        let config: AppConfig = source.try_deserialize()?;
        config.validate()?;

        log::info!("Loaded configuration from {}", path.as_ref().display());
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }

    /// Layers `SYMREG_*` environment variables over the current settings.
    pub fn load_from_env(&self) -> Result<()> {
        self.apply_environment(environment())
    }

    fn apply_environment(&self, env: Environment) -> Result<()> {
        let source = Config::builder()
            .add_source(Config::try_from(&self.get())?)
            .add_source(env)
            .build()?;

        let config: AppConfig = source.try_deserialize()?;
        config.validate()?;

        log::debug!("Applied {}_* environment overrides", ENV_PREFIX);
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Applies `f` and keeps the result only if it validates.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate().map_err(|e| {
            SymregError::Configuration(format!("Rejected configuration update: {}", e))
        })?;
        *config = candidate;
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
