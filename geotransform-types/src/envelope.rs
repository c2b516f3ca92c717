//! See [`Envelope`].

use serde::{Deserialize, Serialize};

use crate::coord::Coordinate;

/// Axis aligned rectangle over the first two components of coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Minimum of the first component.
    pub x_min: f64,
    /// Minimum of the second component.
    pub y_min: f64,
    /// Maximum of the first component.
    pub x_max: f64,
    /// Maximum of the second component.
    pub y_max: f64,
}

impl Envelope {
    /// Creates a new envelope.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Envelope that contains every finite coordinate.
    pub fn unbounded() -> Self {
        Self {
            x_min: f64::NEG_INFINITY,
            y_min: f64::NEG_INFINITY,
            x_max: f64::INFINITY,
            y_max: f64::INFINITY,
        }
    }

    /// Width of the envelope.
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Height of the envelope.
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Returns a copy with the first and second axes swapped.
    pub fn swap_axes(&self) -> Self {
        Self {
            x_min: self.y_min,
            y_min: self.x_min,
            x_max: self.y_max,
            y_max: self.x_max,
        }
    }

    /// Smallest envelope containing both `self` and `other`.
    pub fn merge(&self, other: Self) -> Self {
        Self {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// Envelope of a single coordinate.
    pub fn from_coordinate(c: &Coordinate) -> Self {
        Self {
            x_min: c.x,
            y_min: c.y,
            x_max: c.x,
            y_max: c.y,
        }
    }

    /// Envelope of all the coordinates in the iterator. Returns `None` if the iterator is empty.
    pub fn from_coordinates<'a>(mut coordinates: impl Iterator<Item = &'a Coordinate>) -> Option<Self> {
        let first = coordinates.next()?;
        Some(coordinates.fold(Self::from_coordinate(first), |envelope, c| {
            envelope.merge(Self::from_coordinate(c))
        }))
    }

    /// Returns true if the first two components of the coordinate are inside the envelope or on its border.
    pub fn contains(&self, c: &Coordinate) -> bool {
        self.x_min <= c.x && self.x_max >= c.x && self.y_min <= c.y && self.y_max >= c.y
    }

    /// `[x_min, y_min, x_max, y_max]`
    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.x_min, self.y_min, self.x_max, self.y_max]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_includes_border() {
        let envelope = Envelope::new(0.0, 0.0, 10.0, 5.0);
        assert!(envelope.contains(&Coordinate::new(0.0, 0.0)));
        assert!(envelope.contains(&Coordinate::new(10.0, 5.0)));
        assert!(envelope.contains(&Coordinate::new_3d(3.0, 3.0, 1000.0)));
        assert!(!envelope.contains(&Coordinate::new(10.01, 5.0)));
        assert!(!envelope.contains(&Coordinate::new(5.0, -0.01)));
    }

    #[test]
    fn unbounded_contains_everything_finite() {
        let envelope = Envelope::unbounded();
        assert!(envelope.contains(&Coordinate::new(1e300, -1e300)));
    }

    #[test]
    fn from_coordinates() {
        let coordinates = [
            Coordinate::new(1.0, 5.0),
            Coordinate::new(-2.0, 3.0),
            Coordinate::new(4.0, 4.0),
        ];
        assert_eq!(
            Envelope::from_coordinates(coordinates.iter()),
            Some(Envelope::new(-2.0, 3.0, 4.0, 5.0))
        );
        assert_eq!(Envelope::from_coordinates([].iter()), None);
    }

    #[test]
    fn swap_axes() {
        let envelope = Envelope::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(envelope.swap_axes(), Envelope::new(2.0, 1.0, 4.0, 3.0));
        assert_eq!(envelope.width(), 2.0);
        assert_eq!(envelope.height(), 2.0);
    }
}
