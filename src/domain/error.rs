//! Domain-level errors (no external dependencies)

use itertools::Itertools;
use thiserror::Error;

/// Structural errors raised while building a tree or rolling values up.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("ambiguous root: '{first}' already designated, got '{second}'")]
    AmbiguousRoot { first: String, second: String },

    #[error("no root designated in input")]
    MissingRoot,

    #[error("node '{child}' already has parent '{existing}', cannot attach to '{requested}'")]
    ReparentConflict {
        child: String,
        existing: String,
        requested: String,
    },

    #[error("incomplete aggregation, unresolved nodes: {}", .unresolved.iter().join(", "))]
    IncompleteAggregation { unresolved: Vec<String> },

    #[error("leaf '{0}' has no value after leaf computation")]
    UnresolvedLeaf(String),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors of one aggregation run.
///
/// Failures of the specialization are carried unchanged in `source`.
#[derive(Error, Debug)]
pub enum EngineError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("leaf computation failed: {0}")]
    LeafComputation(#[source] E),

    #[error("combining children of '{node}' failed: {source}")]
    Combine {
        node: String,
        #[source]
        source: E,
    },
}
