//! Error kinds surfaced by the scoring pipeline

use thiserror::Error;

/// Raised when query text cannot be split into a statement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("query contains no statement")]
    Empty,

    #[error("could not tokenize query: {0}")]
    Tokenize(String),

    #[error("unbalanced parenthesis on line {0}")]
    UnbalancedParenthesis(usize),
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("query execution failed: {0}")]
    Execution(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("metrics store error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("linting unavailable: {0}")]
    Lint(String),

    #[error("formatting unavailable: {0}")]
    Format(String),

    #[error("invalid performance sample: {0}")]
    InvalidSample(String),
}

pub type Result<T, E = ScoreError> = std::result::Result<T, E>;
