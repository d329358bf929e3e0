use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Split failed: {0}")]
    Split(#[from] sieve_engine::SieveError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Rules file error: {0}")]
    Rules(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),
}
