//! Coordinate reference systems ([`CrsId`], [`Crs`]) and conversion of coordinates between them
//! ([`ProjectionEngine`]).

pub mod catalogue;
mod crs;
mod datum;
pub mod impls;
mod traits;

pub use crs::{Axis, AxisOrder, Crs, CrsId, CrsKind, CrsPair, Unit};
pub use datum::Datum;
pub use traits::engine::ProjectionEngine;
