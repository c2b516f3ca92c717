//! See [`Coordinate`].

use serde::{Serialize, Serializer};

use crate::error::GeoTransformTypesError;

/// A position with two or three numeric components.
///
/// The meaning of the components (easting/northing, latitude/longitude, geocentric X/Y/Z) is defined by the CRS the
/// coordinate is expressed in. The number of components is part of the value: a 2d coordinate never silently
/// becomes 3d and vice versa.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// First component.
    pub x: f64,
    /// Second component.
    pub y: f64,
    /// Third component, if the coordinate is 3d.
    pub z: Option<f64>,
}

impl Coordinate {
    /// Creates a 2d coordinate.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// Creates a 3d coordinate.
    pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Parses a GeoJSON-like position.
    pub fn from_position(position: &[f64]) -> Result<Self, GeoTransformTypesError> {
        match *position {
            [x, y] => Ok(Self::new(x, y)),
            [x, y, z] => Ok(Self::new_3d(x, y, z)),
            _ => Err(GeoTransformTypesError::Conversion(format!(
                "position must have 2 or 3 components, got {}",
                position.len()
            ))),
        }
    }

    /// Returns the components as a vector of 2 or 3 elements.
    pub fn to_position(&self) -> Vec<f64> {
        match self.z {
            Some(z) => vec![self.x, self.y, z],
            None => vec![self.x, self.y],
        }
    }

    /// Number of components: 2 or 3.
    pub fn dimensions(&self) -> usize {
        if self.z.is_some() {
            3
        } else {
            2
        }
    }

    /// Returns true if all the components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }

    /// Linear interpolation between `self` (`t == 0`) and `other` (`t == 1`).
    ///
    /// The third component is interpolated only if both ends have one.
    pub fn lerp(&self, other: &Coordinate, t: f64) -> Coordinate {
        Coordinate {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: match (self.z, other.z) {
                (Some(a), Some(b)) => Some(a + (b - a) * t),
                _ => None,
            },
        }
    }

    /// Returns a copy with every component rounded to the given number of decimals. The third component uses
    /// `z_decimals`.
    pub fn rounded(&self, xy_decimals: u32, z_decimals: u32) -> Coordinate {
        Coordinate {
            x: round_to(self.x, xy_decimals),
            y: round_to(self.y, xy_decimals),
            z: self.z.map(|z| round_to(z, z_decimals)),
        }
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_position().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn position_dimensions() {
        assert_eq!(Coordinate::from_position(&[1.0, 2.0]).unwrap().dimensions(), 2);
        assert_eq!(
            Coordinate::from_position(&[1.0, 2.0, 3.0]).unwrap(),
            Coordinate::new_3d(1.0, 2.0, 3.0)
        );
        assert_matches!(
            Coordinate::from_position(&[1.0]),
            Err(GeoTransformTypesError::Conversion(_))
        );
        assert_matches!(
            Coordinate::from_position(&[1.0, 2.0, 3.0, 4.0]),
            Err(GeoTransformTypesError::Conversion(_))
        );
    }

    #[test]
    fn lerp_keeps_z_only_when_both_have_it() {
        let a = Coordinate::new_3d(0.0, 0.0, 10.0);
        let b = Coordinate::new_3d(10.0, 20.0, 20.0);
        assert_eq!(a.lerp(&b, 0.5), Coordinate::new_3d(5.0, 10.0, 15.0));

        let c = Coordinate::new(10.0, 20.0);
        assert_eq!(a.lerp(&c, 0.5), Coordinate::new(5.0, 10.0));
    }

    #[test]
    fn rounding() {
        let c = Coordinate::new_3d(1.123456789, 2.987654321, 3.55555);
        assert_eq!(c.rounded(4, 2), Coordinate::new_3d(1.1235, 2.9877, 3.56));
    }

    #[test]
    fn serializes_as_position() {
        let json = serde_json::to_string(&Coordinate::new(1.5, 2.0)).unwrap();
        assert_eq!(json, "[1.5,2.0]");
    }
}
