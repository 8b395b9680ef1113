//! Core error types (thiserror).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibrarianError {
    #[error("I/O error for {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fact store error: {0}")]
    Store(String),

    #[error("Answer provider failed for probe '{probe}': {reason}")]
    ProviderFailed { probe: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

pub type LibrarianResult<T> = Result<T, LibrarianError>;
