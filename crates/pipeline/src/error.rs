//! Error types for the pipeline crate

use thiserror::Error;
use vegtrend_parallel::GraphError;

/// Faults that abort a pipeline run.
///
/// Missing data (masked pixels, months without imagery, parcels without a
/// valid pixel) is never reported here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] vegtrend_core::Error),

    #[error("Task graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Reference parcel with {field} = '{id}' not found")]
    ReferenceNotFound { field: String, id: String },

    #[error("Invalid GeoJSON: {0}")]
    GeoJson(String),

    #[error("Invalid scene manifest: {0}")]
    Manifest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Node '{0}' produced an unexpected output")]
    UnexpectedOutput(String),
}

/// Result alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
