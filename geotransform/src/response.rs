//! Combines the transformed payload with the check outcomes.

use geotransform_types::geo::CrsPair;
use serde_json::Value;

use crate::bbox::BBoxCheckOutcome;
use crate::crs_resolver::{CrsConflict, ResolvedCrs};
use crate::density::DensityReport;
use crate::error::{PayloadError, PipelineError};
use crate::payload::GeometryTree;

/// Successful result of a transformation request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformResponse {
    /// Payload with the coordinates in the target CRS.
    pub payload: GeometryTree,
    /// The CRS pair that was applied.
    pub crs: CrsPair,
    /// Density check result. A failed check does not prevent the payload from being returned.
    pub density: DensityReport,
    /// CRS inputs that were ignored.
    pub conflicts: Vec<CrsConflict>,
}

impl TransformResponse {
    /// Value of the `density-check-result` header.
    pub fn density_header(&self) -> &'static str {
        self.density.outcome.header_value()
    }

    /// Value of the `content-crs` header.
    pub fn content_crs_header(&self) -> String {
        self.crs.target.to_uri()
    }

    /// Value of the `crs-conflict` header, if any input was ignored.
    pub fn conflict_header(&self) -> Option<String> {
        if self.conflicts.is_empty() {
            return None;
        }

        Some(
            self.conflicts
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Media type of the payload.
    pub fn media_type(&self) -> &'static str {
        self.payload.media_type()
    }

    /// Consumes the response, returning the payload as JSON.
    pub fn into_json(self) -> Result<Value, PayloadError> {
        self.payload.into_json()
    }
}

/// Builds the response from the pipeline results.
///
/// The domain check blocks: if it failed, only the violation is returned and the payload is dropped. The density
/// outcome is attached to the payload as is.
pub fn assemble(
    payload: GeometryTree,
    bbox: BBoxCheckOutcome,
    density: DensityReport,
    resolved: ResolvedCrs,
) -> Result<TransformResponse, PipelineError> {
    match bbox {
        BBoxCheckOutcome::Failed(violation) => Err(PipelineError::BBoxDomain(violation)),
        BBoxCheckOutcome::Passed => Ok(TransformResponse {
            payload,
            crs: resolved.pair,
            density,
            conflicts: resolved.conflicts,
        }),
    }
}
