//! Check that the input coordinates lie in the area of use of the source CRS.

use std::fmt::{Display, Formatter};

use geotransform_types::{Coordinate, Envelope};

use crate::walker::{CoordinatePath, Flattened};

/// The first coordinate found outside of the source CRS domain.
#[derive(Debug, Clone, PartialEq)]
pub struct BBoxViolation {
    /// The offending coordinate.
    pub coordinate: Coordinate,
    /// Where in the payload the coordinate is.
    pub path: CoordinatePath,
    /// Domain of the source CRS.
    pub envelope: Envelope,
}

impl Display for BBoxViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "coordinate {:?} is outside of the source CRS domain [{}, {}, {}, {}]",
            self.coordinate.to_position(),
            self.envelope.x_min,
            self.envelope.y_min,
            self.envelope.x_max,
            self.envelope.y_max
        )
    }
}

/// Result of the domain check.
#[derive(Debug, Clone, PartialEq)]
pub enum BBoxCheckOutcome {
    /// All the coordinates are inside the domain.
    Passed,
    /// A coordinate is outside the domain.
    Failed(BBoxViolation),
}

impl BBoxCheckOutcome {
    /// Returns true if the check passed.
    pub fn is_passed(&self) -> bool {
        matches!(self, BBoxCheckOutcome::Passed)
    }
}

/// Checks the coordinates against the envelope in document order and stops at the first one outside it.
///
/// Only the first two components are checked.
pub fn check_bbox(flattened: &Flattened, envelope: &Envelope) -> BBoxCheckOutcome {
    match flattened
        .coordinates
        .iter()
        .position(|c| !envelope.contains(c))
    {
        Some(index) => BBoxCheckOutcome::Failed(BBoxViolation {
            coordinate: flattened.coordinates[index],
            path: flattened.paths[index].clone(),
            envelope: *envelope,
        }),
        None => BBoxCheckOutcome::Passed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::GeometryTree;
    use crate::walker::flatten;
    use geotransform_types::{Geom, Geometry};

    #[test]
    fn reports_first_violation_in_document_order() {
        let tree = GeometryTree::Geometry(Geometry::new(Geom::MultiPoint(vec![
            Coordinate::new(0.5, 0.5),
            Coordinate::new(1.5, 0.5),
            Coordinate::new(1000.0, 1000.0),
        ])));
        let envelope = Envelope::new(0.0, 0.0, 1.0, 1.0);

        let outcome = check_bbox(&flatten(&tree), &envelope);
        assert_eq!(
            outcome,
            BBoxCheckOutcome::Failed(BBoxViolation {
                coordinate: Coordinate::new(1.5, 0.5),
                path: vec![1],
                envelope,
            })
        );
    }

    #[test]
    fn first_coordinate_outside_is_reported_over_a_worse_one() {
        let tree = GeometryTree::Geometry(Geometry::new(Geom::LineString(vec![
            Coordinate::new(7.0, 60.0),
            Coordinate::new(1e6, -1e6),
        ])));
        let envelope = Envelope::new(0.0, 0.0, 6.0, 84.0);

        assert_eq!(
            check_bbox(&flatten(&tree), &envelope),
            BBoxCheckOutcome::Failed(BBoxViolation {
                coordinate: Coordinate::new(7.0, 60.0),
                path: vec![0],
                envelope,
            })
        );
    }

    #[test]
    fn border_and_height_are_inside() {
        let tree = GeometryTree::Geometry(Geometry::new(Geom::LineString(vec![
            Coordinate::new_3d(0.0, 0.0, -500.0),
            Coordinate::new_3d(1.0, 1.0, 9000.0),
        ])));
        assert!(check_bbox(&flatten(&tree), &Envelope::new(0.0, 0.0, 1.0, 1.0)).is_passed());
        assert!(check_bbox(&flatten(&tree), &Envelope::unbounded()).is_passed());
    }

    #[test]
    fn message_names_coordinate_and_envelope() {
        let violation = BBoxViolation {
            coordinate: Coordinate::new(7.0, 60.0),
            path: vec![0],
            envelope: Envelope::new(0.0, 0.0, 6.0, 84.0),
        };
        assert_eq!(
            violation.to_string(),
            "coordinate [7.0, 60.0] is outside of the source CRS domain [0, 0, 6, 84]"
        );
    }
}
