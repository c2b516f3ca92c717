//! Insert vertices into lines and rings so that no segment is longer than a given length.

use geotransform_types::geo::Crs;
use geotransform_types::{Coordinate, Geom, Geometry, Segment};

use crate::error::PipelineError;
use crate::payload::GeometryTree;

/// Adds vertices to the lines and rings of GeoJSON payloads.
///
/// New vertices are placed on every segment longer than `max_segment_length` metres, at that spacing from the start
/// of the segment, exactly as the density check samples them. Rings stay closed and points are not changed.
pub struct Densifier<'a> {
    crs: &'a Crs,
    max_segment_length: f64,
    max_vertices: usize,
}

impl<'a> Densifier<'a> {
    /// Creates a densifier for coordinates in `crs`. The result may have at most `max_vertices` new vertices.
    pub fn new(crs: &'a Crs, max_segment_length: f64, max_vertices: usize) -> Self {
        Self {
            crs,
            max_segment_length,
            max_vertices,
        }
    }

    /// Densifies all geometries of the payload.
    pub fn densify(&self, tree: GeometryTree) -> Result<GeometryTree, PipelineError> {
        if !self.max_segment_length.is_finite() || self.max_segment_length <= 0.0 {
            return Err(PipelineError::InvalidDensityConfig(format!(
                "max-segment-length must be a positive number, got {}",
                self.max_segment_length
            )));
        }

        let mut added = 0;
        Ok(match tree {
            GeometryTree::Geometry(geometry) => GeometryTree::Geometry(self.geometry(geometry, &mut added)?),
            GeometryTree::Feature(mut feature) => {
                feature.geometry = feature
                    .geometry
                    .map(|g| self.geometry(g, &mut added))
                    .transpose()?;
                GeometryTree::Feature(feature)
            }
            GeometryTree::FeatureCollection(mut collection) => {
                for feature in &mut collection.features {
                    if let Some(geometry) = feature.geometry.take() {
                        feature.geometry = Some(self.geometry(geometry, &mut added)?);
                    }
                }
                GeometryTree::FeatureCollection(collection)
            }
            GeometryTree::CityJson(_) => {
                return Err(PipelineError::Unsupported(
                    "densification of CityJSON is not supported".to_string(),
                ))
            }
        })
    }

    fn geometry(&self, geometry: Geometry, added: &mut usize) -> Result<Geometry, PipelineError> {
        let value = match geometry.value {
            Geom::Point(_) | Geom::MultiPoint(_) => geometry.value,
            Geom::LineString(line) => Geom::LineString(self.line(&line, added)?),
            Geom::MultiLineString(lines) => Geom::MultiLineString(self.lines(&lines, added)?),
            Geom::Polygon(rings) => Geom::Polygon(self.lines(&rings, added)?),
            Geom::MultiPolygon(polygons) => Geom::MultiPolygon(
                polygons
                    .iter()
                    .map(|p| self.lines(p, added))
                    .collect::<Result<_, _>>()?,
            ),
            Geom::GeometryCollection(children) => Geom::GeometryCollection(
                children
                    .into_iter()
                    .map(|child| self.geometry(child, added))
                    .collect::<Result<_, _>>()?,
            ),
        };

        Ok(Geometry { value, ..geometry })
    }

    fn lines(&self, lines: &[Vec<Coordinate>], added: &mut usize) -> Result<Vec<Vec<Coordinate>>, PipelineError> {
        lines.iter().map(|line| self.line(line, added)).collect()
    }

    fn line(&self, line: &[Coordinate], added: &mut usize) -> Result<Vec<Coordinate>, PipelineError> {
        let mut result = Vec::with_capacity(line.len());
        for pair in line.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            result.push(*a);

            let length = self.crs.distance(a, b);
            *added = added.saturating_add(Segment::sample_count(length, self.max_segment_length));
            if *added > self.max_vertices {
                return Err(PipelineError::DensityLimit {
                    required: *added,
                    limit: self.max_vertices,
                });
            }
            result.extend(Segment(a, b).samples(length, self.max_segment_length));
        }
        result.extend(line.last());

        Ok(result)
    }
}
