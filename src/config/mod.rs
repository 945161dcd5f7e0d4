pub mod traits;
pub mod evolution;
pub mod manager;

pub use manager::{AppConfig, ConfigManager};
pub use evolution::EvolutionConfig;
pub use traits::{ConfigManifest, ConfigSection, FieldManifest};
