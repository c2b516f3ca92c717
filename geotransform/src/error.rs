//! Error types used by the crate.

use geotransform_types::{GeoTransformTypesError, TransformError};
use thiserror::Error;

use crate::bbox::BBoxViolation;

/// Reasons a (source, target) CRS pair cannot be determined for a request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrsResolutionError {
    /// Neither `target-crs` nor `accept-crs` was given.
    #[error("target CRS is required")]
    MissingTarget,
    /// No source CRS was given, the payload has none and no default is configured.
    #[error("source CRS is required")]
    MissingSource,
    /// The string is not a CRS identifier.
    #[error("{0} is not a valid CRS identifier")]
    InvalidIdentifier(String),
    /// The identifier is valid but the projection engine does not know the CRS.
    #[error("CRS {0} is not supported")]
    UnknownCrs(String),
    /// Different parts of the payload declare different CRSs.
    #[error("payload declares conflicting CRSs: {first} and {other}")]
    InconsistentEmbeddedCrs {
        /// First declaration found.
        first: String,
        /// Declaration that disagrees with the first one.
        other: String,
    },
    /// The target CRS has more dimensions than the source CRS, so the missing component cannot be filled in.
    #[error("transformation from {from} ({from_dimensions}D) to {to} ({to_dimensions}D) is not possible")]
    DimensionMismatch {
        /// Source CRS.
        from: String,
        /// Number of dimensions of the source CRS.
        from_dimensions: usize,
        /// Target CRS.
        to: String,
        /// Number of dimensions of the target CRS.
        to_dimensions: usize,
    },
}

/// Problems with the structure of an input payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayloadError {
    /// The payload is not valid JSON or does not have the structure of its format.
    #[error("invalid payload: {0}")]
    Malformed(String),
    /// The payload is valid JSON of a type that cannot be transformed.
    #[error("unsupported payload type: {0}")]
    UnsupportedType(String),
    /// A geometry cannot be converted.
    #[error(transparent)]
    Geometry(#[from] GeoTransformTypesError),
    /// A position has a different number of components than its CRS.
    #[error("position has {found} components, {crs} requires {expected}")]
    Dimensions {
        /// Number of components of the position.
        found: usize,
        /// Number of components of the CRS.
        expected: usize,
        /// The CRS.
        crs: String,
    },
}

/// Error returned by [`Pipeline`](crate::Pipeline) operations.
///
/// Density check failures are not errors: they are reported as
/// [`DensityCheckOutcome::Failure`](crate::DensityCheckOutcome::Failure) next to the transformed payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// The CRS pair cannot be resolved.
    #[error(transparent)]
    CrsResolution(#[from] CrsResolutionError),
    /// A coordinate lies outside of the area of use of the source CRS.
    #[error("{0}")]
    BBoxDomain(BBoxViolation),
    /// The projection engine failed.
    #[error(transparent)]
    TransformEngine(#[from] TransformError),
    /// The payload cannot be processed.
    #[error(transparent)]
    InvalidPayload(#[from] PayloadError),
    /// Density check parameters are out of range.
    #[error("invalid density check configuration: {0}")]
    InvalidDensityConfig(String),
    /// Resampling the payload would need more points than allowed.
    #[error("density check needs {required} sample points, the limit is {limit}")]
    DensityLimit {
        /// Number of points the request needs.
        required: usize,
        /// Configured limit.
        limit: usize,
    },
    /// The engine returned a different number of coordinates than it was given, or a coordinate path does not match
    /// the payload.
    #[error("transformed coordinates do not match the payload structure: {0}")]
    StructureMismatch(String),
    /// The operation does not support the payload format.
    #[error("{0}")]
    Unsupported(String),
}

impl From<GeoTransformTypesError> for PipelineError {
    fn from(value: GeoTransformTypesError) -> Self {
        Self::InvalidPayload(value.into())
    }
}
