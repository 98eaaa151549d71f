//! Error taxonomy for the storage and similarity side of the harness.
//!
//! Provider failures are not represented here: they are data, recorded per
//! source inside an aggregated result by the dispatcher in the app crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Two vectors of different length were compared, or a provider returned
    /// a vector that does not match the deployment's dimensionality.
    #[error("vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The embedding provider failed; fatal to the operation that needed it.
    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),

    /// The backing document or vector store could not serve the request.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("case not found: {0}")]
    CaseNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
