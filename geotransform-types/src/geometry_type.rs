//! See documentation for [`GeometryType`].
use serde::{Deserialize, Serialize};

/// Name of a geometry variant, as it appears in the `type` member of GeoJSON and CityJSON geometry objects.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum GeometryType {
    /// GeoJSON `Point`.
    Point,
    /// `MultiPoint` in both formats.
    MultiPoint,
    /// GeoJSON `LineString`.
    LineString,
    /// `MultiLineString` in both formats.
    MultiLineString,
    /// GeoJSON `Polygon`.
    Polygon,
    /// GeoJSON `MultiPolygon`.
    MultiPolygon,
    /// GeoJSON `GeometryCollection`.
    GeometryCollection,
    /// CityJSON `MultiSurface`.
    MultiSurface,
    /// CityJSON `CompositeSurface`.
    CompositeSurface,
    /// CityJSON `Solid`.
    Solid,
    /// CityJSON `MultiSolid`.
    MultiSolid,
    /// CityJSON `CompositeSolid`.
    CompositeSolid,
    /// CityJSON `GeometryInstance`.
    GeometryInstance,
}

impl GeometryType {
    /// Parses the value of a `type` member.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Point" => Self::Point,
            "MultiPoint" => Self::MultiPoint,
            "LineString" => Self::LineString,
            "MultiLineString" => Self::MultiLineString,
            "Polygon" => Self::Polygon,
            "MultiPolygon" => Self::MultiPolygon,
            "GeometryCollection" => Self::GeometryCollection,
            "MultiSurface" => Self::MultiSurface,
            "CompositeSurface" => Self::CompositeSurface,
            "Solid" => Self::Solid,
            "MultiSolid" => Self::MultiSolid,
            "CompositeSolid" => Self::CompositeSolid,
            "GeometryInstance" => Self::GeometryInstance,
            _ => return None,
        })
    }

    /// Returns true if the geometry has line segments whose density can be checked.
    pub fn has_segments(&self) -> bool {
        !matches!(self, Self::Point | Self::MultiPoint | Self::GeometryInstance)
    }

    /// Returns true if the lines of the geometry are rings, so the last vertex connects back to the first one.
    pub fn has_rings(&self) -> bool {
        matches!(
            self,
            Self::Polygon
                | Self::MultiPolygon
                | Self::MultiSurface
                | Self::CompositeSurface
                | Self::Solid
                | Self::MultiSolid
                | Self::CompositeSolid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(GeometryType::from_name("Solid"), Some(GeometryType::Solid));
        assert_eq!(GeometryType::from_name("solid"), None);
        assert!(GeometryType::MultiSurface.has_rings());
        assert!(!GeometryType::MultiLineString.has_rings());
        assert!(!GeometryType::GeometryInstance.has_segments());
    }
}
