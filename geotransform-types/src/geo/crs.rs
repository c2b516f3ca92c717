use std::fmt::{Display, Formatter};
use std::str::FromStr;

use ::geo::{GeodesicDistance, Point};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::coord::Coordinate;
use crate::envelope::Envelope;
use crate::error::GeoTransformTypesError;
use crate::geo::datum::Datum;

lazy_static! {
    static ref AUTHORITY_CODE: Regex = Regex::new(r"^(?i)([a-z][a-z0-9]*):([a-z0-9._-]+)$").unwrap();
    static ref NUMERIC_CODE: Regex = Regex::new(r"^[0-9]+$").unwrap();
    static ref OGC_URN: Regex =
        Regex::new(r"^(?i)urn:ogc:def:crs:([a-z][a-z0-9]*):([a-z0-9._]*):([a-z0-9._-]+)$").unwrap();
    static ref OGC_URI: Regex = Regex::new(
        r"^(?i)https?://www\.opengis\.net/def/crs/([a-z][a-z0-9]*)/([a-z0-9._]+)/([a-z0-9._-]+)/?$"
    )
    .unwrap();
}

/// Normalised name of a coordinate reference system: an authority and a code within that authority.
///
/// All the usual spellings of a CRS name parse into the same value:
///
/// ```
/// use geotransform_types::geo::CrsId;
///
/// let a: CrsId = "EPSG:4326".parse().unwrap();
/// let b: CrsId = "urn:ogc:def:crs:EPSG::4326".parse().unwrap();
/// let c: CrsId = "http://www.opengis.net/def/crs/EPSG/0/4326".parse().unwrap();
/// let d: CrsId = "4326".parse().unwrap();
/// assert!(a == b && b == c && c == d);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrsId {
    authority: String,
    code: String,
}

impl CrsId {
    /// Creates a new identifier. Both parts are converted to upper case.
    pub fn new(authority: &str, code: &str) -> Self {
        Self {
            authority: authority.to_uppercase(),
            code: code.to_uppercase(),
        }
    }

    /// EPSG identifier with the given code.
    pub fn epsg(code: u32) -> Self {
        Self::new("EPSG", &code.to_string())
    }

    /// OGC:CRS84, WGS 84 longitude/latitude.
    pub fn crs84() -> Self {
        Self::new("OGC", "CRS84")
    }

    /// Authority, e.g. `EPSG`.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Code within the authority, e.g. `4326`.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// OGC http URI of the CRS, e.g. `http://www.opengis.net/def/crs/EPSG/0/4326`.
    pub fn to_uri(&self) -> String {
        format!(
            "http://www.opengis.net/def/crs/{}/{}/{}",
            self.authority,
            self.version(),
            self.code
        )
    }

    /// OGC URN of the CRS, e.g. `urn:ogc:def:crs:EPSG::4326`.
    pub fn to_urn(&self) -> String {
        let version = match self.version() {
            "0" => "",
            v => v,
        };
        format!("urn:ogc:def:crs:{}:{}:{}", self.authority, version, self.code)
    }

    fn version(&self) -> &'static str {
        if self.authority == "OGC" {
            "1.3"
        } else {
            "0"
        }
    }
}

impl Display for CrsId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}

impl FromStr for CrsId {
    type Err = GeoTransformTypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if NUMERIC_CODE.is_match(trimmed) {
            return Ok(Self::new("EPSG", trimmed));
        }

        if let Some(captures) = AUTHORITY_CODE.captures(trimmed) {
            return Ok(Self::new(&captures[1], &captures[2]));
        }

        if let Some(captures) = OGC_URN
            .captures(trimmed)
            .or_else(|| OGC_URI.captures(trimmed))
        {
            return Ok(Self::new(&captures[1], &captures[3]));
        }

        Err(GeoTransformTypesError::InvalidCrsIdentifier(s.to_string()))
    }
}

impl Serialize for CrsId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Source and target CRS of one transformation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrsPair {
    /// CRS the input coordinates are in.
    pub source: CrsId,
    /// CRS the output coordinates are in.
    pub target: CrsId,
}

impl CrsPair {
    /// Creates a new pair.
    pub fn new(source: CrsId, target: CrsId) -> Self {
        Self { source, target }
    }

    /// Returns true if source and target are the same CRS.
    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }
}

impl Display for CrsPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Kind of coordinates a CRS uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsKind {
    /// Latitude and longitude in degrees.
    Geographic2d,
    /// Latitude, longitude in degrees and ellipsoidal height in metres.
    Geographic3d,
    /// Easting and northing in metres on a map projection.
    Projected,
    /// Earth centered cartesian X, Y, Z in metres.
    Geocentric,
}

impl CrsKind {
    /// Human readable name of the kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            CrsKind::Geographic2d => "Geographic 2D CRS",
            CrsKind::Geographic3d => "Geographic 3D CRS",
            CrsKind::Projected => "Projected CRS",
            CrsKind::Geocentric => "Geocentric CRS",
        }
    }

    /// Returns true for geographic CRSs.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsKind::Geographic2d | CrsKind::Geographic3d)
    }
}

/// Order of the horizontal axes of a CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// Longitude/easting first.
    EastNorth,
    /// Latitude/northing first.
    NorthEast,
}

/// Unit of the horizontal components of a CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Angular degree.
    Degree,
    /// Metre.
    Metre,
}

/// Description of one axis of a CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Axis {
    /// Axis name.
    pub name: &'static str,
    /// Axis abbreviation.
    pub abbreviation: &'static str,
    /// Axis unit.
    pub unit: Unit,
}

/// Coordinate reference system known to a projection engine.
#[derive(Debug, Clone)]
pub struct Crs {
    /// Identifier.
    pub id: CrsId,
    /// Name of the CRS.
    pub name: &'static str,
    /// Kind of coordinates.
    pub kind: CrsKind,
    /// Order of horizontal axes.
    pub axis_order: AxisOrder,
    /// Geodetic datum.
    pub datum: Datum,
    /// Parameters of the `geodesy` operator that converts geographic coordinates (radians) on the datum into the
    /// coordinates of the CRS, without the ellipsoid. Geographic CRSs have none.
    pub definition: Option<&'static str>,
    /// Area of use as longitude/latitude degrees.
    pub area_of_use: Envelope,
}

impl Crs {
    /// Number of components the coordinates of this CRS have.
    pub fn dimensions(&self) -> usize {
        match self.kind {
            CrsKind::Geographic2d | CrsKind::Projected => 2,
            CrsKind::Geographic3d | CrsKind::Geocentric => 3,
        }
    }

    /// Full `geodesy` operator definition: [`Crs::definition`] on the ellipsoid of the datum.
    pub fn operator(&self) -> Option<String> {
        self.definition
            .map(|definition| format!("{definition} ellps={}", self.datum.ellipsoid()))
    }

    /// Unit of the horizontal components.
    pub fn unit(&self) -> Unit {
        if self.kind.is_geographic() {
            Unit::Degree
        } else {
            Unit::Metre
        }
    }

    /// Axes in the order coordinates list their components.
    pub fn axes(&self) -> Vec<Axis> {
        let (east, north) = match self.kind {
            CrsKind::Geographic2d | CrsKind::Geographic3d => (
                Axis {
                    name: "Geodetic longitude",
                    abbreviation: "Lon",
                    unit: Unit::Degree,
                },
                Axis {
                    name: "Geodetic latitude",
                    abbreviation: "Lat",
                    unit: Unit::Degree,
                },
            ),
            CrsKind::Projected => (
                Axis {
                    name: "Easting",
                    abbreviation: "E",
                    unit: Unit::Metre,
                },
                Axis {
                    name: "Northing",
                    abbreviation: "N",
                    unit: Unit::Metre,
                },
            ),
            CrsKind::Geocentric => {
                return vec![
                    Axis {
                        name: "Geocentric X",
                        abbreviation: "X",
                        unit: Unit::Metre,
                    },
                    Axis {
                        name: "Geocentric Y",
                        abbreviation: "Y",
                        unit: Unit::Metre,
                    },
                    Axis {
                        name: "Geocentric Z",
                        abbreviation: "Z",
                        unit: Unit::Metre,
                    },
                ]
            }
        };

        let mut axes = match self.axis_order {
            AxisOrder::EastNorth => vec![east, north],
            AxisOrder::NorthEast => vec![north, east],
        };

        if self.kind == CrsKind::Geographic3d {
            axes.push(Axis {
                name: "Ellipsoidal height",
                abbreviation: "h",
                unit: Unit::Metre,
            });
        }

        axes
    }

    /// Returns `(lon, lat)` or `(easting, northing)` of the coordinate, regardless of the axis order of the CRS.
    pub fn east_north(&self, c: &Coordinate) -> (f64, f64) {
        match self.axis_order {
            AxisOrder::EastNorth => (c.x, c.y),
            AxisOrder::NorthEast => (c.y, c.x),
        }
    }

    /// Builds a coordinate in the axis order of the CRS from east and north components.
    pub fn from_east_north(&self, east: f64, north: f64, z: Option<f64>) -> Coordinate {
        match self.axis_order {
            AxisOrder::EastNorth => Coordinate { x: east, y: north, z },
            AxisOrder::NorthEast => Coordinate { x: north, y: east, z },
        }
    }

    /// Distance in metres between two coordinates of this CRS.
    ///
    /// Geographic coordinates use the geodesic distance on the WGS 84 ellipsoid combined with the height difference.
    /// Projected coordinates use the planar distance, geocentric ones the 3d distance.
    pub fn distance(&self, a: &Coordinate, b: &Coordinate) -> f64 {
        let dz = match (a.z, b.z) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        };

        match self.kind {
            CrsKind::Geographic2d | CrsKind::Geographic3d => {
                let (a_lon, a_lat) = self.east_north(a);
                let (b_lon, b_lat) = self.east_north(b);
                let horizontal = Point::new(a_lon, a_lat).geodesic_distance(&Point::new(b_lon, b_lat));
                horizontal.hypot(dz)
            }
            CrsKind::Projected => (b.x - a.x).hypot(b.y - a.y),
            CrsKind::Geocentric => (b.x - a.x).hypot(b.y - a.y).hypot(dz),
        }
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    #[test]
    fn parse_identifiers() {
        let epsg4326 = CrsId::epsg(4326);
        for s in [
            "EPSG:4326",
            "epsg:4326",
            " 4326 ",
            "urn:ogc:def:crs:EPSG::4326",
            "urn:ogc:def:crs:EPSG:9.8.15:4326",
            "http://www.opengis.net/def/crs/EPSG/0/4326",
            "https://www.opengis.net/def/crs/EPSG/0/4326",
        ] {
            assert_eq!(s.parse::<CrsId>().unwrap(), epsg4326, "{s}");
        }

        assert_eq!(
            "urn:ogc:def:crs:OGC:1.3:CRS84".parse::<CrsId>().unwrap(),
            CrsId::crs84()
        );
        assert_eq!(
            "http://www.opengis.net/def/crs/OGC/1.3/CRS84".parse::<CrsId>().unwrap(),
            CrsId::crs84()
        );
    }

    #[test]
    fn reject_garbage() {
        for s in ["", "EPSG", "EPSG:", "urn:ogc:def:crs:EPSG", "http://example.com/4326", "EPSG:4326:1"] {
            assert_matches!(
                s.parse::<CrsId>(),
                Err(GeoTransformTypesError::InvalidCrsIdentifier(_)),
                "{s}"
            );
        }
    }

    #[test]
    fn render_identifiers() {
        let id = CrsId::epsg(28992);
        assert_eq!(id.to_string(), "EPSG:28992");
        assert_eq!(id.to_uri(), "http://www.opengis.net/def/crs/EPSG/0/28992");
        assert_eq!(id.to_urn(), "urn:ogc:def:crs:EPSG::28992");
        assert_eq!(CrsId::crs84().to_urn(), "urn:ogc:def:crs:OGC:1.3:CRS84");
        assert_eq!(id.to_uri().parse::<CrsId>().unwrap(), id);
    }

    #[test]
    fn identity_pair() {
        let pair = CrsPair::new("EPSG:3857".parse().unwrap(), CrsId::epsg(3857));
        assert!(pair.is_identity());
        assert!(!CrsPair::new(CrsId::crs84(), CrsId::epsg(4326)).is_identity());
    }

    #[test]
    fn geodesic_distance_respects_axis_order() {
        let crs84 = crate::geo::catalogue::find(&CrsId::crs84()).unwrap();
        let epsg4326 = crate::geo::catalogue::find(&CrsId::epsg(4326)).unwrap();

        let lon_lat = crs84.distance(&Coordinate::new(5.0, 52.0), &Coordinate::new(5.0, 53.0));
        let lat_lon = epsg4326.distance(&Coordinate::new(52.0, 5.0), &Coordinate::new(53.0, 5.0));
        assert_abs_diff_eq!(lon_lat, lat_lon, epsilon = 1e-6);
        // One degree of latitude is about 111.2 km at these latitudes.
        assert!((111_000.0..111_500.0).contains(&lon_lat));
    }
}
