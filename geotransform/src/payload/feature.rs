use geojson::feature::Id;
use geotransform_types::{GeoTransformTypesError, Geometry, JsonObject};

/// GeoJSON feature: an optional geometry with properties that are carried through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Geometry of the feature.
    pub geometry: Option<Geometry>,
    /// Identifier of the feature.
    pub id: Option<Id>,
    /// Feature properties.
    pub properties: Option<JsonObject>,
    /// Bounding box member.
    pub bbox: Option<Vec<f64>>,
    /// Other members of the feature object, including `crs`.
    pub foreign_members: Option<JsonObject>,
}

/// GeoJSON feature collection.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    /// Features in document order.
    pub features: Vec<Feature>,
    /// Bounding box member.
    pub bbox: Option<Vec<f64>>,
    /// Other members of the collection object, including `crs`.
    pub foreign_members: Option<JsonObject>,
}

impl TryFrom<geojson::Feature> for Feature {
    type Error = GeoTransformTypesError;

    fn try_from(feature: geojson::Feature) -> Result<Self, Self::Error> {
        Ok(Self {
            geometry: feature.geometry.map(Geometry::try_from).transpose()?,
            id: feature.id,
            properties: feature.properties,
            bbox: feature.bbox,
            foreign_members: feature.foreign_members,
        })
    }
}

impl From<Feature> for geojson::Feature {
    fn from(feature: Feature) -> Self {
        geojson::Feature {
            bbox: feature.bbox,
            geometry: feature.geometry.map(geojson::Geometry::from),
            id: feature.id,
            properties: feature.properties,
            foreign_members: feature.foreign_members,
        }
    }
}

impl TryFrom<geojson::FeatureCollection> for FeatureCollection {
    type Error = GeoTransformTypesError;

    fn try_from(collection: geojson::FeatureCollection) -> Result<Self, Self::Error> {
        Ok(Self {
            features: collection
                .features
                .into_iter()
                .map(Feature::try_from)
                .collect::<Result<_, _>>()?,
            bbox: collection.bbox,
            foreign_members: collection.foreign_members,
        })
    }
}

impl From<FeatureCollection> for geojson::FeatureCollection {
    fn from(collection: FeatureCollection) -> Self {
        geojson::FeatureCollection {
            bbox: collection.bbox,
            features: collection
                .features
                .into_iter()
                .map(geojson::Feature::from)
                .collect(),
            foreign_members: collection.foreign_members,
        }
    }
}
