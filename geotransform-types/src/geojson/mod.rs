//! Conversions between [`Geometry`] and [`geojson::Geometry`](::geojson::Geometry).

use ::geojson::{LineStringType, PolygonType, Position, Value};

use crate::coord::Coordinate;
use crate::error::GeoTransformTypesError;
use crate::geometry::{Geom, Geometry};

impl TryFrom<::geojson::Geometry> for Geometry {
    type Error = GeoTransformTypesError;

    fn try_from(geometry: ::geojson::Geometry) -> Result<Self, Self::Error> {
        let value = match &geometry.value {
            Value::Point(p) => Geom::Point(Coordinate::from_position(p)?),
            Value::MultiPoint(points) => Geom::MultiPoint(convert_line(points)?),
            Value::LineString(points) => Geom::LineString(convert_line(points)?),
            Value::MultiLineString(lines) => Geom::MultiLineString(convert_multi_line(lines)?),
            Value::Polygon(polygon) => Geom::Polygon(convert_multi_line(polygon)?),
            Value::MultiPolygon(mp) => Geom::MultiPolygon(convert_multi_polygon(mp)?),
            Value::GeometryCollection(geometries) => Geom::GeometryCollection(
                geometries
                    .iter()
                    .map(|g| Geometry::try_from(g.clone()))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        Ok(Geometry {
            value,
            bbox: geometry.bbox,
            foreign_members: geometry.foreign_members,
        })
    }
}

impl From<Geometry> for ::geojson::Geometry {
    fn from(geometry: Geometry) -> Self {
        let value = match geometry.value {
            Geom::Point(c) => Value::Point(c.to_position()),
            Geom::MultiPoint(points) => Value::MultiPoint(to_positions(&points)),
            Geom::LineString(points) => Value::LineString(to_positions(&points)),
            Geom::MultiLineString(lines) => Value::MultiLineString(to_multi_positions(&lines)),
            Geom::Polygon(rings) => Value::Polygon(to_multi_positions(&rings)),
            Geom::MultiPolygon(mp) => {
                Value::MultiPolygon(mp.iter().map(|p| to_multi_positions(p)).collect())
            }
            Geom::GeometryCollection(geometries) => Value::GeometryCollection(
                geometries.into_iter().map(::geojson::Geometry::from).collect(),
            ),
        };

        ::geojson::Geometry {
            bbox: geometry.bbox,
            value,
            foreign_members: geometry.foreign_members,
        }
    }
}

fn convert_line(line: &LineStringType) -> Result<Vec<Coordinate>, GeoTransformTypesError> {
    line.iter()
        .map(|p| Coordinate::from_position(p))
        .collect()
}

fn convert_multi_line(
    lines: &[LineStringType],
) -> Result<Vec<Vec<Coordinate>>, GeoTransformTypesError> {
    lines.iter().map(convert_line).collect()
}

fn convert_multi_polygon(
    mp: &[PolygonType],
) -> Result<Vec<Vec<Vec<Coordinate>>>, GeoTransformTypesError> {
    mp.iter().map(|p| convert_multi_line(p)).collect()
}

fn to_positions(coordinates: &[Coordinate]) -> Vec<Position> {
    coordinates.iter().map(Coordinate::to_position).collect()
}

fn to_multi_positions(lines: &[Vec<Coordinate>]) -> Vec<Vec<Position>> {
    lines.iter().map(|l| to_positions(l)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn polygon_with_foreign_members() {
        let json = r#"{
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0, 5.0], [0.0, 0.0]]],
            "bbox": [0.0, 0.0, 1.0, 1.0],
            "name": "square"
        }"#;
        let geometry: ::geojson::Geometry = serde_json::from_str(json).unwrap();
        let converted = Geometry::try_from(geometry).unwrap();

        let Geom::Polygon(rings) = &converted.value else {
            panic!("expected polygon");
        };
        assert_eq!(rings[0][2], Coordinate::new_3d(1.0, 1.0, 5.0));
        assert_eq!(rings[0][1], Coordinate::new(1.0, 0.0));
        assert_eq!(converted.bbox, Some(vec![0.0, 0.0, 1.0, 1.0]));
        assert_eq!(
            converted.foreign_members.as_ref().unwrap()["name"],
            serde_json::json!("square")
        );

        let back = ::geojson::Geometry::from(converted);
        assert_matches!(&back.value, Value::Polygon(rings) if rings[0][2] == vec![1.0, 1.0, 5.0]);
    }

    #[test]
    fn rejects_one_dimensional_position() {
        let geometry = ::geojson::Geometry::new(Value::LineString(vec![vec![1.0, 2.0], vec![3.0]]));
        assert_matches!(
            Geometry::try_from(geometry),
            Err(GeoTransformTypesError::Conversion(_))
        );
    }
}
