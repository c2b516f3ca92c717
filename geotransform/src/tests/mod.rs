use std::cell::Cell;
use std::f64::consts::PI;

use geotransform_types::geo::{catalogue, Crs, CrsId, CrsPair, ProjectionEngine};
use geotransform_types::{Coordinate, Envelope, Geom, Geometry, JsonObject, TransformError};
use serde_json::json;

use crate::payload::{Feature, FeatureCollection, GeometryTree};

type Mapping = Box<dyn Fn(&Coordinate) -> Coordinate>;

/// Engine with a fixed mapping that counts how it is used.
pub struct TestEngine {
    mapping: Mapping,
    domain: Envelope,
    calls: Cell<usize>,
    transformed: Cell<usize>,
}

impl TestEngine {
    /// Largest sideways shift of the [`TestEngine::bulging`] mapping.
    pub const BULGE: f64 = 1.0;

    pub fn with_mapping(mapping: impl Fn(&Coordinate) -> Coordinate + 'static) -> Self {
        Self {
            mapping: Box::new(mapping),
            domain: Envelope::unbounded(),
            calls: Cell::new(0),
            transformed: Cell::new(0),
        }
    }

    /// Maps straight lines to straight lines.
    pub fn affine() -> Self {
        Self::with_mapping(Self::affine_map)
    }

    pub fn affine_map(c: &Coordinate) -> Coordinate {
        Coordinate {
            x: 2.0 * c.x + 10.0,
            y: 2.0 * c.y - 5.0,
            z: c.z,
        }
    }

    /// Shifts each axis by up to [`TestEngine::BULGE`] depending on the other one, with a period of 400 units. Points
    /// at multiples of 400 do not move, points at 200 + 400k are shifted the most.
    pub fn bulging() -> Self {
        Self::with_mapping(|c| Coordinate {
            x: c.x + Self::BULGE * bulge(c.y),
            y: c.y + Self::BULGE * bulge(c.x),
            z: c.z,
        })
    }

    pub fn with_domain(mut self, domain: Envelope) -> Self {
        self.domain = domain;
        self
    }

    /// Number of `transform` calls.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Number of coordinates passed to `transform` over all calls.
    pub fn transformed_count(&self) -> usize {
        self.transformed.get()
    }
}

fn bulge(t: f64) -> f64 {
    (PI * t / 400.0).sin().powi(2)
}

impl ProjectionEngine for TestEngine {
    fn crs_list(&self) -> &[Crs] {
        catalogue::all()
    }

    fn transform(&self, _pair: &CrsPair, coordinates: &[Coordinate]) -> Result<Vec<Coordinate>, TransformError> {
        self.calls.set(self.calls.get() + 1);
        self.transformed.set(self.transformed.get() + coordinates.len());
        Ok(coordinates.iter().map(|c| (self.mapping)(c)).collect())
    }

    fn domain_of(&self, id: &CrsId) -> Result<Envelope, TransformError> {
        match self.crs(id) {
            Some(_) => Ok(self.domain),
            None => Err(TransformError::UnknownCrs(id.to_string())),
        }
    }
}

fn properties(name: &str) -> Option<JsonObject> {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), json!(name));
    Some(properties)
}

fn feature(geometry: Option<Geom>, name: &str) -> Feature {
    Feature {
        geometry: geometry.map(Geometry::new),
        id: Some(geojson::feature::Id::String(name.to_string())),
        properties: properties(name),
        bbox: None,
        foreign_members: None,
    }
}

/// Feature collection with all geometry variants, mixed dimensions, nested and empty collections, and a feature
/// without geometry.
pub fn collection_tree() -> GeometryTree {
    let c = Coordinate::new;
    let c3 = Coordinate::new_3d;

    GeometryTree::FeatureCollection(FeatureCollection {
        features: vec![
            feature(Some(Geom::Point(c(1.0, 2.0))), "point"),
            feature(
                Some(Geom::Polygon(vec![vec![
                    c(0.0, 0.0),
                    c(10.0, 0.0),
                    c(10.0, 10.0),
                    c(0.0, 0.0),
                ]])),
                "polygon",
            ),
            feature(
                Some(Geom::GeometryCollection(vec![
                    Geometry::new(Geom::LineString(vec![c3(0.0, 0.0, 1.0), c3(5.0, 5.0, 2.0)])),
                    Geometry::new(Geom::MultiPoint(vec![c(1.0, 1.0), c3(2.0, 2.0, 3.0)])),
                    Geometry::new(Geom::GeometryCollection(vec![])),
                    Geometry::new(Geom::MultiPolygon(vec![
                        vec![vec![c(0.0, 0.0), c(1.0, 0.0), c(0.0, 0.0)]],
                        vec![vec![c(5.0, 5.0), c(6.0, 5.0), c(5.0, 6.0)]],
                    ])),
                ])),
                "collection",
            ),
            feature(None, "empty"),
            feature(
                Some(Geom::MultiLineString(vec![
                    vec![c(0.0, 0.0), c(1.0, 1.0)],
                    vec![c(2.0, 2.0), c(3.0, 3.0), c(4.0, 4.0)],
                ])),
                "lines",
            ),
        ],
        bbox: None,
        foreign_members: None,
    })
}

/// CityJSON document with a triangle whose closing edge is longer than 200 units, and a point object.
pub fn city_tree() -> GeometryTree {
    let json = json!({
        "type": "CityJSON",
        "version": "2.0",
        "metadata": {"referenceSystem": "https://www.opengis.net/def/crs/EPSG/0/32631"},
        "CityObjects": {
            "a-roof": {
                "type": "Building",
                "geometry": [{"type": "MultiSurface", "lod": "2", "boundaries": [[[0, 1, 2]]]}]
            },
            "b-lamp": {
                "type": "CityFurniture",
                "geometry": [{"type": "MultiPoint", "lod": "1", "boundaries": [3]}]
            }
        },
        "vertices": [[0.0, 0.0, 0.0], [0.0, 150.0, 0.0], [120.0, 180.0, 0.0], [50.0, 50.0, 3.0]]
    });

    match GeometryTree::from_json(json) {
        Ok(tree) => tree,
        Err(err) => panic!("invalid fixture: {err}"),
    }
}
