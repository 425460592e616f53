//! Error types for query construction and traversal.

use thiserror::Error;

/// Errors surfaced by the query engine.
///
/// Every variant is a deterministic validation failure: queries never retry,
/// and a query that fails returns no results at all.
#[derive(Error, Debug)]
pub enum GeoQueryError {
    /// An envelope was constructed with `min > max` in some dimension.
    #[error("Invalid envelope: min {min:?} exceeds max {max:?}")]
    InvalidEnvelope { min: Vec<f64>, max: Vec<f64> },

    /// A binary envelope operation received envelopes of different dimensions.
    #[error("Envelope dimension mismatch: {left} != {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// A query argument list had the wrong arity or types.
    #[error("Invalid query argument: {0}")]
    InvalidArgument(String),

    /// An unknown predicate name was requested.
    #[error("Unsupported spatial operation: {0}")]
    UnsupportedOperation(String),

    /// The geometry provider failed to decode or evaluate a geometry.
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// The tree index was handed an unknown layer or a dangling node handle.
    #[error("Index error: {0}")]
    Index(String),
}

pub type Result<T> = std::result::Result<T, GeoQueryError>;
