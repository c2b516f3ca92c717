//! Error types used by the crate.

use thiserror::Error;

/// Error enum for conversions and parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoTransformTypesError {
    /// Geometry conversion error.
    #[error("invalid input geometry: {0}")]
    Conversion(String),
    /// The string cannot be interpreted as a CRS identifier.
    #[error("invalid CRS identifier: {0}")]
    InvalidCrsIdentifier(String),
}

/// Errors reported by a [`ProjectionEngine`](crate::geo::ProjectionEngine).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// The engine has no definition for the CRS.
    #[error("CRS {0} is not supported")]
    UnknownCrs(String),
    /// The engine could not build an operator for the CRS.
    #[error("cannot instantiate operator for {crs}: {reason}")]
    Definition {
        /// CRS whose operator failed.
        crs: String,
        /// Engine message.
        reason: String,
    },
    /// The engine rejected the transformation.
    #[error("transformation from {from} to {to} failed: {reason}")]
    Failed {
        /// Source CRS.
        from: String,
        /// Target CRS.
        to: String,
        /// Engine message.
        reason: String,
    },
    /// A coordinate does not have the number of components the CRS needs.
    #[error("coordinate {index} has {found} components, {crs} requires {expected}")]
    Dimensions {
        /// Position of the coordinate in the batch.
        index: usize,
        /// Number of components of the coordinate.
        found: usize,
        /// Number of components the CRS requires.
        expected: usize,
        /// CRS that requires them.
        crs: String,
    },
    /// The transformation produced an infinite or NaN value.
    #[error("transformation produced a non-finite value for coordinate {0}")]
    NonFinite(usize),
}

impl TransformError {
    /// Returns true if the error is caused by the input values rather than by the engine itself.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TransformError::Dimensions { .. } | TransformError::NonFinite(_)
        )
    }
}
