//! Structure preserving traversal of [`GeometryTree`]s.
//!
//! Transforming a tree is done in three steps:
//! 1. [`flatten`] collects every coordinate of the tree in document order, tagging each with the
//!    [`CoordinatePath`] that leads to it from the root;
//! 2. the coordinates are transformed as one batch;
//! 3. [`rebuild`] writes each result back to the position its path points to.
//!
//! Nothing except coordinate values changes: the number of features, children, lines, rings and vertices, their order,
//! and all non-geometry members stay as they were.

use geotransform_types::geo::{Crs, CrsId, ProjectionEngine};
use geotransform_types::{Coordinate, Geom, Geometry, JsonObject};
use log::debug;
use serde_json::{json, Value};

use crate::error::PipelineError;
use crate::payload::{FeatureCollection, GeometryTree};
use crate::transformer::{CoordinateTransformer, Precision};

/// Indices leading from the root of a [`GeometryTree`] to one coordinate.
///
/// * Feature collection: index of the feature, then the path within its geometry.
/// * Geometry collection: index of the child, then the path within the child.
/// * Point: empty.
/// * MultiPoint, LineString: index of the position.
/// * MultiLineString, Polygon: index of the line or ring, then of the position.
/// * MultiPolygon: index of the polygon, of the ring, then of the position.
/// * CityJSON: index of the vertex.
pub type CoordinatePath = Vec<usize>;

/// All coordinates of a tree in document order, with their paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flattened {
    /// Coordinates in document order.
    pub coordinates: Vec<Coordinate>,
    /// Path of each coordinate.
    pub paths: Vec<CoordinatePath>,
}

impl Flattened {
    fn push(&mut self, path: &[usize], c: &Coordinate) {
        self.coordinates.push(*c);
        self.paths.push(path.to_vec());
    }
}

/// Collects all the coordinates of the tree in document order.
pub fn flatten(tree: &GeometryTree) -> Flattened {
    let mut flattened = Flattened::default();
    let mut path = vec![];
    match tree {
        GeometryTree::Geometry(geometry) => flatten_geom(&geometry.value, &mut path, &mut flattened),
        GeometryTree::Feature(feature) => {
            if let Some(geometry) = &feature.geometry {
                flatten_geom(&geometry.value, &mut path, &mut flattened);
            }
        }
        GeometryTree::FeatureCollection(collection) => {
            for (i, feature) in collection.features.iter().enumerate() {
                if let Some(geometry) = &feature.geometry {
                    path.push(i);
                    flatten_geom(&geometry.value, &mut path, &mut flattened);
                    path.pop();
                }
            }
        }
        GeometryTree::CityJson(city) => {
            for (i, vertex) in city.vertices.iter().enumerate() {
                flattened.push(&[i], vertex);
            }
        }
    }

    flattened
}

fn flatten_geom(geom: &Geom, path: &mut Vec<usize>, out: &mut Flattened) {
    match geom {
        Geom::Point(c) => out.push(path, c),
        Geom::MultiPoint(line) | Geom::LineString(line) => flatten_line(line, path, out),
        Geom::MultiLineString(lines) | Geom::Polygon(lines) => flatten_lines(lines, path, out),
        Geom::MultiPolygon(polygons) => {
            for (i, polygon) in polygons.iter().enumerate() {
                path.push(i);
                flatten_lines(polygon, path, out);
                path.pop();
            }
        }
        Geom::GeometryCollection(children) => {
            for (i, child) in children.iter().enumerate() {
                path.push(i);
                flatten_geom(&child.value, path, out);
                path.pop();
            }
        }
    }
}

fn flatten_lines(lines: &[Vec<Coordinate>], path: &mut Vec<usize>, out: &mut Flattened) {
    for (i, line) in lines.iter().enumerate() {
        path.push(i);
        flatten_line(line, path, out);
        path.pop();
    }
}

fn flatten_line(line: &[Coordinate], path: &mut Vec<usize>, out: &mut Flattened) {
    for (i, c) in line.iter().enumerate() {
        path.push(i);
        out.push(path, c);
        path.pop();
    }
}

/// Writes the coordinates back into the tree at the positions the paths point to.
pub fn rebuild(
    tree: &mut GeometryTree,
    paths: &[CoordinatePath],
    coordinates: Vec<Coordinate>,
) -> Result<(), PipelineError> {
    if paths.len() != coordinates.len() {
        return Err(PipelineError::StructureMismatch(format!(
            "{} paths for {} coordinates",
            paths.len(),
            coordinates.len()
        )));
    }

    for (path, c) in paths.iter().zip(coordinates) {
        let slot = coordinate_mut(tree, path)
            .ok_or_else(|| PipelineError::StructureMismatch(format!("no coordinate at {path:?}")))?;
        *slot = c;
    }

    Ok(())
}

/// Coordinate the path points to.
pub fn coordinate_mut<'a>(tree: &'a mut GeometryTree, path: &[usize]) -> Option<&'a mut Coordinate> {
    match tree {
        GeometryTree::Geometry(geometry) => geom_coordinate_mut(&mut geometry.value, path),
        GeometryTree::Feature(feature) => geom_coordinate_mut(&mut feature.geometry.as_mut()?.value, path),
        GeometryTree::FeatureCollection(collection) => {
            let (first, rest) = path.split_first()?;
            let geometry = collection.features.get_mut(*first)?.geometry.as_mut()?;
            geom_coordinate_mut(&mut geometry.value, rest)
        }
        GeometryTree::CityJson(city) => match path {
            [i] => city.vertices.get_mut(*i),
            _ => None,
        },
    }
}

fn geom_coordinate_mut<'a>(geom: &'a mut Geom, path: &[usize]) -> Option<&'a mut Coordinate> {
    match (geom, path) {
        (Geom::Point(c), []) => Some(c),
        (Geom::MultiPoint(line) | Geom::LineString(line), [i]) => line.get_mut(*i),
        (Geom::MultiLineString(lines) | Geom::Polygon(lines), [i, j]) => lines.get_mut(*i)?.get_mut(*j),
        (Geom::MultiPolygon(polygons), [i, j, k]) => polygons.get_mut(*i)?.get_mut(*j)?.get_mut(*k),
        (Geom::GeometryCollection(children), [i, rest @ ..]) => {
            geom_coordinate_mut(&mut children.get_mut(*i)?.value, rest)
        }
        _ => None,
    }
}

/// Transforms all the coordinates of the tree with a single call to the transformer and applies the output
/// conventions of the target CRS: precision rounding, recomputed `bbox` members, the embedded CRS declaration and,
/// for CityJSON, the vertex quantisation and geographical extent.
pub fn transform_tree<E: ProjectionEngine + ?Sized>(
    mut tree: GeometryTree,
    transformer: &CoordinateTransformer<'_, E>,
    target: &Crs,
    precision: Precision,
) -> Result<GeometryTree, PipelineError> {
    let Flattened { coordinates, paths } = flatten(&tree);
    debug!(
        "Transforming {} coordinates with {}",
        coordinates.len(),
        transformer.pair()
    );

    let transformed = transformer
        .transform(&coordinates)?
        .iter()
        .map(|c| precision.round(target, c))
        .collect();
    rebuild(&mut tree, &paths, transformed)?;

    refresh_bboxes(&mut tree);
    set_crs(&mut tree, target);

    Ok(tree)
}

/// Recomputes every `bbox` member that is present in the tree from the current coordinates.
pub fn refresh_bboxes(tree: &mut GeometryTree) {
    match tree {
        GeometryTree::Geometry(geometry) => refresh_geometry_bbox(geometry),
        GeometryTree::Feature(feature) => {
            if let Some(geometry) = &mut feature.geometry {
                refresh_geometry_bbox(geometry);
            }
            if feature.bbox.is_some() {
                feature.bbox = feature.geometry.as_ref().and_then(|g| g.value.bbox());
            }
        }
        GeometryTree::FeatureCollection(collection) => refresh_collection_bbox(collection),
        GeometryTree::CityJson(city) => city.update_geographical_extent(),
    }
}

fn refresh_geometry_bbox(geometry: &mut Geometry) {
    if let Geom::GeometryCollection(children) = &mut geometry.value {
        children.iter_mut().for_each(refresh_geometry_bbox);
    }
    if geometry.bbox.is_some() {
        geometry.bbox = geometry.value.bbox();
    }
}

fn refresh_collection_bbox(collection: &mut FeatureCollection) {
    for feature in &mut collection.features {
        if let Some(geometry) = &mut feature.geometry {
            refresh_geometry_bbox(geometry);
        }
        if feature.bbox.is_some() {
            feature.bbox = feature.geometry.as_ref().and_then(|g| g.value.bbox());
        }
    }

    if collection.bbox.is_some() {
        let all = Geom::GeometryCollection(
            collection
                .features
                .iter()
                .filter_map(|f| f.geometry.clone())
                .collect(),
        );
        collection.bbox = all.bbox();
    }
}

/// GeoJSON `crs` member naming the CRS.
pub fn crs_member(id: &CrsId) -> Value {
    json!({
        "type": "name",
        "properties": {"name": id.to_urn()}
    })
}

const CRS_MEMBER: &str = "crs";

fn replace_crs_member(members: &mut Option<JsonObject>, id: &CrsId) {
    if let Some(crs) = members.as_mut().and_then(|m| m.get_mut(CRS_MEMBER)) {
        *crs = crs_member(id);
    }
}

/// Rewrites the CRS declarations of the tree to name the given CRS.
///
/// GeoJSON `crs` members are replaced where they exist. CityJSON always gets `metadata.referenceSystem`, and its
/// vertices are quantised again with a scale suited to the units of the CRS when the document uses quantisation.
pub fn set_crs(tree: &mut GeometryTree, crs: &Crs) {
    match tree {
        GeometryTree::Geometry(geometry) => replace_crs_member(&mut geometry.foreign_members, &crs.id),
        GeometryTree::Feature(feature) => replace_crs_member(&mut feature.foreign_members, &crs.id),
        GeometryTree::FeatureCollection(collection) => {
            replace_crs_member(&mut collection.foreign_members, &crs.id);
            for feature in &mut collection.features {
                replace_crs_member(&mut feature.foreign_members, &crs.id);
            }
        }
        GeometryTree::CityJson(city) => {
            city.set_reference_system(crs.id.to_uri());
            if city.transform.is_some() {
                city.requantize(Precision::cityjson_scale(crs));
            }
        }
    }
}
