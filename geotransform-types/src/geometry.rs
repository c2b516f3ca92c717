use crate::coord::Coordinate;
use crate::envelope::Envelope;
use crate::geometry_type::GeometryType;

/// JSON object used for foreign members and feature properties.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Closed set of geometry variants with their coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Geom {
    /// Single position.
    Point(Coordinate),
    /// Set of positions.
    MultiPoint(Vec<Coordinate>),
    /// Open or closed line.
    LineString(Vec<Coordinate>),
    /// Set of lines.
    MultiLineString(Vec<Vec<Coordinate>>),
    /// Outer ring followed by the holes.
    Polygon(Vec<Vec<Coordinate>>),
    /// Set of polygons.
    MultiPolygon(Vec<Vec<Vec<Coordinate>>>),
    /// Heterogeneous set of geometries, possibly nested.
    GeometryCollection(Vec<Geometry>),
}

/// Geometry together with the members of its JSON object that are not coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Coordinates.
    pub value: Geom,
    /// Bounding box member, if the input had one.
    pub bbox: Option<Vec<f64>>,
    /// Members the format does not define. They are carried to the output unchanged.
    pub foreign_members: Option<JsonObject>,
}

impl Geometry {
    /// Geometry without bbox or foreign members.
    pub fn new(value: Geom) -> Self {
        Self {
            value,
            bbox: None,
            foreign_members: None,
        }
    }

    /// Type of the geometry.
    pub fn geometry_type(&self) -> GeometryType {
        self.value.geometry_type()
    }
}

impl From<Geom> for Geometry {
    fn from(value: Geom) -> Self {
        Self::new(value)
    }
}

impl Geom {
    /// Type of the geometry.
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geom::Point(_) => GeometryType::Point,
            Geom::MultiPoint(_) => GeometryType::MultiPoint,
            Geom::LineString(_) => GeometryType::LineString,
            Geom::MultiLineString(_) => GeometryType::MultiLineString,
            Geom::Polygon(_) => GeometryType::Polygon,
            Geom::MultiPolygon(_) => GeometryType::MultiPolygon,
            Geom::GeometryCollection(_) => GeometryType::GeometryCollection,
        }
    }

    /// Visits all coordinates in document order.
    pub fn for_each_coordinate<'a>(&'a self, f: &mut impl FnMut(&'a Coordinate)) {
        match self {
            Geom::Point(c) => f(c),
            Geom::MultiPoint(v) | Geom::LineString(v) => v.iter().for_each(f),
            Geom::MultiLineString(v) | Geom::Polygon(v) => v.iter().flatten().for_each(f),
            Geom::MultiPolygon(v) => v.iter().flatten().flatten().for_each(f),
            Geom::GeometryCollection(v) => v.iter().for_each(|g| g.value.for_each_coordinate(f)),
        }
    }

    /// Largest number of components among the coordinates, or `None` for an empty geometry.
    pub fn dimensions(&self) -> Option<usize> {
        let mut dimensions = None;
        self.for_each_coordinate(&mut |c| {
            dimensions = Some(dimensions.map_or(c.dimensions(), |d: usize| d.max(c.dimensions())))
        });
        dimensions
    }

    /// Envelope of all the coordinates.
    pub fn envelope(&self) -> Option<Envelope> {
        let mut envelope: Option<Envelope> = None;
        self.for_each_coordinate(&mut |c| {
            let point = Envelope::from_coordinate(c);
            envelope = Some(envelope.map_or(point, |e| e.merge(point)));
        });
        envelope
    }

    /// Bounding box in the GeoJSON layout: 4 values for 2d geometries and 6 values if any coordinate has a third
    /// component.
    pub fn bbox(&self) -> Option<Vec<f64>> {
        let envelope = self.envelope()?;
        let mut z_range: Option<(f64, f64)> = None;
        self.for_each_coordinate(&mut |c| {
            if let Some(z) = c.z {
                z_range = Some(z_range.map_or((z, z), |(min, max)| (min.min(z), max.max(z))));
            }
        });

        Some(match z_range {
            Some((z_min, z_max)) => vec![
                envelope.x_min,
                envelope.y_min,
                z_min,
                envelope.x_max,
                envelope.y_max,
                z_max,
            ],
            None => envelope.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> Geom {
        Geom::GeometryCollection(vec![
            Geom::Point(Coordinate::new(1.0, 2.0)).into(),
            Geom::Polygon(vec![vec![
                Coordinate::new_3d(0.0, 0.0, 5.0),
                Coordinate::new_3d(4.0, 0.0, 7.0),
                Coordinate::new_3d(4.0, 4.0, 6.0),
                Coordinate::new_3d(0.0, 0.0, 5.0),
            ]])
            .into(),
        ])
    }

    #[test]
    fn coordinates_in_document_order() {
        let geom = collection();
        let mut visited = vec![];
        geom.for_each_coordinate(&mut |c| visited.push(c.x));
        assert_eq!(visited, vec![1.0, 0.0, 4.0, 4.0, 0.0]);
        assert_eq!(geom.dimensions(), Some(3));
    }

    #[test]
    fn bbox_with_z() {
        assert_eq!(
            collection().bbox(),
            Some(vec![0.0, 0.0, 5.0, 4.0, 4.0, 7.0])
        );
        assert_eq!(
            Geom::LineString(vec![Coordinate::new(1.0, 1.0), Coordinate::new(-1.0, 3.0)]).bbox(),
            Some(vec![-1.0, 1.0, 1.0, 3.0])
        );
        assert_eq!(Geom::MultiPoint(vec![]).bbox(), None);
    }
}
