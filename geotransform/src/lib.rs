//! Geotransform converts GeoJSON and CityJSON documents between coordinate reference systems and checks that the
//! result can be trusted.
//!
//! # Quick start
//!
//! ```
//! use geotransform::geotransform_types::geo::impls::GeodesyEngine;
//! use geotransform::{CrsInputs, DensityCheckConfig, GeometryTree, Pipeline, PipelineConfig};
//! use serde_json::json;
//!
//! let pipeline = Pipeline::new(GeodesyEngine::new(), PipelineConfig::default());
//! let payload = GeometryTree::from_json(json!({"type": "Point", "coordinates": [5.0, 52.0]})).unwrap();
//!
//! let response = pipeline
//!     .process(
//!         payload,
//!         &CrsInputs::new(Some("OGC:CRS84"), Some("EPSG:3857")),
//!         &DensityCheckConfig::default(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(response.density_header(), "not-applicable");
//! assert_eq!(response.content_crs_header(), "http://www.opengis.net/def/crs/EPSG/0/3857");
//! ```
//!
//! # Main components
//!
//! A request is handled by the [`Pipeline`], which runs these steps in order:
//!
//! * [`crs_resolver`] decides the source and target CRS from the request parameters, the CRS declared inside the
//!   payload and the configured default, and records every input it had to ignore.
//! * [`bbox`] checks that all the coordinates lie in the area of use of the source CRS. The first coordinate outside
//!   of it stops the request before anything is transformed.
//! * [`density`] checks whether long segments keep their shape when transformed, by transforming points along them
//!   and measuring how far they land from the transformed segment. A failure is reported, not enforced.
//! * [`walker`] flattens the payload into one batch of coordinates tagged with their position, transforms the batch
//!   with a [`CoordinateTransformer`] and writes the result back, so the structure of the document never changes.
//! * [`response`] puts the transformed payload and the check outcomes together.
//!
//! The coordinates themselves are transformed by a [`ProjectionEngine`](geotransform_types::geo::ProjectionEngine).
//! With the default `geodesy` feature, [`GeodesyEngine`](geotransform_types::geo::impls::GeodesyEngine) is available.

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

pub mod bbox;
pub mod crs_resolver;
pub mod densify;
pub mod density;
pub mod error;
pub mod payload;
mod pipeline;
pub mod response;
mod transformer;
pub mod walker;

#[cfg(test)]
mod tests;

pub use bbox::{BBoxCheckOutcome, BBoxViolation};
pub use crs_resolver::{CrsConflict, CrsInputs, CrsOrigin, CrsPrecedence, ResolvedCrs, ResolverConfig};
pub use density::{DensityCheckConfig, DensityCheckOutcome, DensityReport, FailedSegment};
pub use error::{CrsResolutionError, PayloadError, PipelineError};
pub use payload::GeometryTree;
pub use pipeline::{Pipeline, PipelineConfig};
pub use response::TransformResponse;
pub use transformer::{CoordinateTransformer, Precision};

// Reexport geotransform_types
pub use geotransform_types;
