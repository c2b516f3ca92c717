use geotransform_types::{Coordinate, Envelope, GeometryType, JsonObject};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PayloadError;

const VERTICES: &str = "vertices";
const TRANSFORM: &str = "transform";
const CITY_OBJECTS: &str = "CityObjects";
const METADATA: &str = "metadata";
const REFERENCE_SYSTEM: &str = "referenceSystem";
const GEOGRAPHICAL_EXTENT: &str = "geographicalExtent";

/// Quantisation parameters of CityJSON vertices: `real = stored * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CityTransform {
    /// Size of one step of the stored integers along each axis.
    pub scale: [f64; 3],
    /// Offset added after scaling.
    pub translate: [f64; 3],
}

impl CityTransform {
    fn decode(&self, stored: &[f64]) -> Vec<f64> {
        stored
            .iter()
            .enumerate()
            .map(|(i, v)| v * self.scale[i] + self.translate[i])
            .collect()
    }

    fn encode(&self, c: &Coordinate) -> Vec<Value> {
        c.to_position()
            .iter()
            .enumerate()
            .map(|(i, v)| Value::from(((v - self.translate[i]) / self.scale[i]).round() as i64))
            .collect()
    }
}

/// CityJSON document.
///
/// Only the shared vertex list is interpreted: every geometry of every city object references its coordinates by
/// index, so the city objects themselves pass through unchanged when the vertices are transformed.
#[derive(Debug, Clone, PartialEq)]
pub struct CityJson {
    /// Quantisation of the stored vertices, if the document uses it.
    pub transform: Option<CityTransform>,
    /// Decoded (real) vertex coordinates.
    pub vertices: Vec<Coordinate>,
    /// The `CityObjects` member.
    pub city_objects: JsonObject,
    /// The `metadata` member.
    pub metadata: Option<JsonObject>,
    /// All other members of the document.
    pub extra: JsonObject,
}

/// Boundary structure of one city object geometry, with the lines expressed as vertex indices.
#[derive(Debug, Clone, PartialEq)]
pub struct CityGeometry {
    /// Type of the geometry.
    pub geometry_type: GeometryType,
    /// Lines or rings of the boundary in document order.
    pub lines: Vec<Vec<usize>>,
}

impl CityJson {
    /// Reads a CityJSON document from its JSON object.
    pub fn from_json(mut object: JsonObject) -> Result<Self, PayloadError> {
        let transform = object
            .remove(TRANSFORM)
            .map(serde_json::from_value::<CityTransform>)
            .transpose()
            .map_err(|err| PayloadError::Malformed(format!("invalid CityJSON transform: {err}")))?;

        let vertices = match object.remove(VERTICES) {
            Some(value) => serde_json::from_value::<Vec<Vec<f64>>>(value)
                .map_err(|err| PayloadError::Malformed(format!("invalid CityJSON vertices: {err}")))?,
            None => vec![],
        };
        let vertices = vertices
            .iter()
            .map(|v| match &transform {
                Some(transform) if v.len() <= 3 => Coordinate::from_position(&transform.decode(v)),
                _ => Coordinate::from_position(v),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let city_objects = match object.remove(CITY_OBJECTS) {
            Some(Value::Object(objects)) => objects,
            Some(_) => {
                return Err(PayloadError::Malformed(
                    "CityObjects must be an object".to_string(),
                ))
            }
            None => JsonObject::new(),
        };

        let metadata = match object.remove(METADATA) {
            Some(Value::Object(metadata)) => Some(metadata),
            Some(_) => {
                return Err(PayloadError::Malformed(
                    "metadata must be an object".to_string(),
                ))
            }
            None => None,
        };

        Ok(Self {
            transform,
            vertices,
            city_objects,
            metadata,
            extra: object,
        })
    }

    /// Writes the document back into JSON. Vertices are quantised with [`CityJson::transform`] when it is set.
    pub fn into_json(self) -> Value {
        let mut object = self.extra;
        let vertices = self
            .vertices
            .iter()
            .map(|v| match &self.transform {
                Some(transform) => Value::Array(transform.encode(v)),
                None => Value::from(v.to_position()),
            })
            .collect();
        object.insert(VERTICES.to_string(), Value::Array(vertices));
        object.insert(CITY_OBJECTS.to_string(), Value::Object(self.city_objects));

        if let Some(transform) = self.transform {
            object.insert(
                TRANSFORM.to_string(),
                serde_json::json!({"scale": transform.scale, "translate": transform.translate}),
            );
        }
        if let Some(metadata) = self.metadata {
            object.insert(METADATA.to_string(), Value::Object(metadata));
        }

        Value::Object(object)
    }

    /// Value of `metadata.referenceSystem`.
    pub fn reference_system(&self) -> Option<&Value> {
        self.metadata.as_ref()?.get(REFERENCE_SYSTEM)
    }

    /// Sets `metadata.referenceSystem`, creating the metadata object if needed.
    pub fn set_reference_system(&mut self, uri: String) {
        self.metadata
            .get_or_insert_with(JsonObject::new)
            .insert(REFERENCE_SYSTEM.to_string(), Value::String(uri));
    }

    /// Replaces the quantisation with a new one using the given scale and the minimum corner of the vertices as
    /// translation.
    pub fn requantize(&mut self, scale: [f64; 3]) {
        let [x, y, z] = self.min_corner();
        self.transform = Some(CityTransform {
            scale,
            translate: [x, y, z],
        });
    }

    /// Recomputes `metadata.geographicalExtent` from the vertices, if the member is present.
    pub fn update_geographical_extent(&mut self) {
        let Some(envelope) = Envelope::from_coordinates(self.vertices.iter()) else {
            return;
        };
        let (z_min, z_max) = self.z_range();

        if let Some(extent) = self
            .metadata
            .as_mut()
            .and_then(|metadata| metadata.get_mut(GEOGRAPHICAL_EXTENT))
        {
            *extent = serde_json::json!([
                envelope.x_min,
                envelope.y_min,
                z_min,
                envelope.x_max,
                envelope.y_max,
                z_max
            ]);
        }
    }

    /// Boundaries of all the geometries of all the city objects.
    pub fn geometries(&self) -> Result<Vec<CityGeometry>, PayloadError> {
        let mut geometries = vec![];
        for (id, object) in &self.city_objects {
            let Some(list) = object.get("geometry").and_then(Value::as_array) else {
                continue;
            };

            for geometry in list {
                let type_name = geometry.get("type").and_then(Value::as_str).unwrap_or_default();
                let geometry_type = GeometryType::from_name(type_name).ok_or_else(|| {
                    PayloadError::Malformed(format!(
                        "city object {id} has geometry of unknown type '{type_name}'"
                    ))
                })?;

                let mut lines = vec![];
                if let Some(boundaries) = geometry.get("boundaries") {
                    self.collect_lines(boundaries, &mut lines)?;
                }

                geometries.push(CityGeometry {
                    geometry_type,
                    lines,
                });
            }
        }

        Ok(geometries)
    }

    fn collect_lines(&self, value: &Value, lines: &mut Vec<Vec<usize>>) -> Result<(), PayloadError> {
        let Value::Array(items) = value else {
            return Err(PayloadError::Malformed(format!(
                "invalid CityJSON boundary: {value}"
            )));
        };

        if items.iter().all(Value::is_array) {
            for item in items {
                self.collect_lines(item, lines)?;
            }
            return Ok(());
        }

        let line = items
            .iter()
            .map(|item| {
                item.as_u64()
                    .map(|index| index as usize)
                    .filter(|index| *index < self.vertices.len())
                    .ok_or_else(|| {
                        PayloadError::Malformed(format!("invalid CityJSON vertex index: {item}"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        lines.push(line);

        Ok(())
    }

    fn min_corner(&self) -> [f64; 3] {
        match Envelope::from_coordinates(self.vertices.iter()) {
            Some(envelope) => [envelope.x_min, envelope.y_min, self.z_range().0],
            None => [0.0; 3],
        }
    }

    fn z_range(&self) -> (f64, f64) {
        self.vertices
            .iter()
            .filter_map(|v| v.z)
            .fold(None, |range: Option<(f64, f64)>, z| {
                Some(range.map_or((z, z), |(min, max)| (min.min(z), max.max(z))))
            })
            .unwrap_or((0.0, 0.0))
    }
}
