//! Graph construction and evaluation errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Node '{node}' depends on unknown node #{dependency}")]
    UnknownDependency { node: String, dependency: usize },

    #[error("Duplicate node name: {0}")]
    DuplicateName(String),

    #[error("Output of node '{0}' is not available")]
    MissingOutput(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}
