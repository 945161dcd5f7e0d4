use thiserror::Error;

#[derive(Error, Debug)]
pub enum SymregError {
    #[error("Invalid structural edit: {0}")]
    InvalidEdit(String),

    #[error("Malformed tree: {0}")]
    MalformedTree(String),

    #[error("Arity mismatch for '{op}': expected {expected} children, got {actual}")]
    ArityMismatch {
        op: String,
        expected: usize,
        actual: usize,
    },

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Config loading error: {0}")]
    Config(#[from] ::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, SymregError>;
