//! Input and output documents: GeoJSON geometries, features and feature collections, and CityJSON.

use geojson::GeoJson;
use geotransform_types::{Geometry, JsonObject};
use serde_json::Value;

use crate::error::PayloadError;

mod cityjson;
mod feature;

pub use cityjson::{CityGeometry, CityJson, CityTransform};
pub use feature::{Feature, FeatureCollection};

/// Media type of GeoJSON documents.
pub const GEOJSON_MEDIA_TYPE: &str = "application/geo+json";
/// Media type of CityJSON documents.
pub const CITYJSON_MEDIA_TYPE: &str = "application/city+json";

/// A document whose coordinates can be transformed.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryTree {
    /// Bare GeoJSON geometry.
    Geometry(Geometry),
    /// GeoJSON feature.
    Feature(Feature),
    /// GeoJSON feature collection.
    FeatureCollection(FeatureCollection),
    /// CityJSON document.
    CityJson(CityJson),
}

impl GeometryTree {
    /// Reads a document from JSON. Objects with `"type": "CityJSON"` are read as CityJSON, everything else as GeoJSON.
    pub fn from_json(value: Value) -> Result<Self, PayloadError> {
        match value {
            Value::Object(object) if object.get("type").and_then(Value::as_str) == Some("CityJSON") => {
                Ok(Self::CityJson(CityJson::from_json(object)?))
            }
            Value::Object(_) => {
                let geojson = GeoJson::from_json_value(value)
                    .map_err(|err| PayloadError::Malformed(err.to_string()))?;
                Ok(match geojson {
                    GeoJson::Geometry(geometry) => Self::Geometry(geometry.try_into()?),
                    GeoJson::Feature(feature) => Self::Feature(feature.try_into()?),
                    GeoJson::FeatureCollection(collection) => {
                        Self::FeatureCollection(collection.try_into()?)
                    }
                })
            }
            other => Err(PayloadError::UnsupportedType(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Parses a document from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PayloadError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|err| PayloadError::Malformed(err.to_string()))?;
        Self::from_json(value)
    }

    /// Writes the document into JSON.
    pub fn into_json(self) -> Result<Value, PayloadError> {
        let geojson = match self {
            GeometryTree::CityJson(city) => return Ok(city.into_json()),
            GeometryTree::Geometry(geometry) => GeoJson::Geometry(geometry.into()),
            GeometryTree::Feature(feature) => GeoJson::Feature(feature.into()),
            GeometryTree::FeatureCollection(collection) => GeoJson::FeatureCollection(collection.into()),
        };

        serde_json::to_value(&geojson).map_err(|err| PayloadError::Malformed(err.to_string()))
    }

    /// Media type of the document format.
    pub fn media_type(&self) -> &'static str {
        match self {
            GeometryTree::CityJson(_) => CITYJSON_MEDIA_TYPE,
            _ => GEOJSON_MEDIA_TYPE,
        }
    }

    /// Top level members that are not part of the format, for GeoJSON documents.
    pub fn foreign_members(&self) -> Option<&JsonObject> {
        match self {
            GeometryTree::Geometry(geometry) => geometry.foreign_members.as_ref(),
            GeometryTree::Feature(feature) => feature.foreign_members.as_ref(),
            GeometryTree::FeatureCollection(collection) => collection.foreign_members.as_ref(),
            GeometryTree::CityJson(_) => None,
        }
    }
}

impl From<Geometry> for GeometryTree {
    fn from(value: Geometry) -> Self {
        Self::Geometry(value)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
