use thiserror::Error;

/// Top-level error type for GraphKB.
#[derive(Error, Debug)]
pub enum GraphKbError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),
}
