use thiserror::Error;
use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at the entry of each analysis operation. They are deterministic
/// validation failures: an operation either returns a complete result or one of those.
#[derive(Debug, Error)]
pub enum Error {

    /// Malformed shape or cardinality (too few samples, out-of-range cluster count, etc).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A feature has zero standard deviation and scaling was requested.
    #[error("Feature at column {column} has zero variance and cannot be scaled")]
    DegenerateFeature { column : usize },

    #[error("Matrix decomposition failed: {0}")]
    Decomposition(String),

    #[error("Could not parse value '{value}' at row {row}, column {column}")]
    Parse { row : usize, column : usize, value : String },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error)

}

impl Error {

    pub(crate) fn invalid(msg : impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

}
