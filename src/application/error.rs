//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::application::numeric::NumericError;
use crate::domain::{EngineError, TreeError};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Tree(#[from] TreeError),

    #[error("{0}")]
    Aggregation(#[from] EngineError<NumericError>),

    #[error("{0}")]
    Numeric(#[from] NumericError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("{context}: {source}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
