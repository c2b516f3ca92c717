//! Value types shared by the geotransform crates.
//!
//! * [`Coordinate`], [`Envelope`] and [`Segment`] are the numeric primitives.
//! * [`Geom`] and [`Geometry`] form the closed set of supported geometry variants.
//! * The [`geo`] module names coordinate reference systems ([`geo::CrsId`]), describes the ones a projection engine
//!   knows about ([`geo::Crs`]) and defines the [`geo::ProjectionEngine`] trait together with an implementation backed
//!   by the `geodesy` crate.

pub mod coord;
pub mod envelope;
pub mod error;
pub mod geo;
pub mod geometry;
pub mod geometry_type;
pub mod segment;

#[cfg(feature = "geojson")]
pub mod geojson;

pub use coord::Coordinate;
pub use envelope::Envelope;
pub use error::{GeoTransformTypesError, TransformError};
pub use geometry::{Geom, Geometry, JsonObject};
pub use geometry_type::GeometryType;
pub use segment::Segment;
