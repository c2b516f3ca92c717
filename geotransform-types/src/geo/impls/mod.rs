//! Implementations of [`ProjectionEngine`](super::ProjectionEngine).

#[cfg(feature = "geodesy")]
mod geodesy;

#[cfg(feature = "geodesy")]
pub use self::geodesy::GeodesyEngine;
