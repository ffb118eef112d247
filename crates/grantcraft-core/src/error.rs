use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrantError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown grant mechanism: {0}")]
    UnknownMechanism(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<csv::Error> for GrantError {
    fn from(err: csv::Error) -> Self {
        GrantError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GrantError>;
