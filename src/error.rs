//! Error types for the generation pipeline.

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur in the generation pipeline.
///
/// Computation failures are in-band protocol messages surfaced through the
/// store, not values of this type; only transport and lifecycle failures
/// are.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A request could not be handed to an executor (channel unavailable).
    /// Fatal to the current cycle; no retry is attempted.
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// The pipeline actor has shut down and no longer accepts requests.
    #[error("pipeline shut down")]
    ShutDown,
}
