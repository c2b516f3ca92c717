//! Built-in list of coordinate reference systems.
//!
//! Each entry has the parameters of the `geodesy` operator that converts geographic coordinates on its datum into the
//! coordinates of the CRS. The ellipsoid comes from the datum. Entries on different datums are related by the null
//! transformation, which is accurate to about a metre for WGS 84 and ETRS89.

use lazy_static::lazy_static;

use crate::envelope::Envelope;
use crate::geo::crs::{AxisOrder, Crs, CrsId, CrsKind};
use crate::geo::datum::Datum;

const WORLD: Envelope = Envelope {
    x_min: -180.0,
    y_min: -90.0,
    x_max: 180.0,
    y_max: 90.0,
};

const EUROPE: Envelope = Envelope {
    x_min: -16.1,
    y_min: 32.88,
    x_max: 40.18,
    y_max: 84.73,
};

lazy_static! {
    static ref CATALOGUE: Vec<Crs> = vec![
        geographic(CrsId::crs84(), "WGS 84 (CRS84)", CrsKind::Geographic2d, AxisOrder::EastNorth, Datum::WGS84, WORLD),
        geographic(CrsId::epsg(4326), "WGS 84", CrsKind::Geographic2d, AxisOrder::NorthEast, Datum::WGS84, WORLD),
        geographic(CrsId::epsg(4979), "WGS 84", CrsKind::Geographic3d, AxisOrder::NorthEast, Datum::WGS84, WORLD),
        Crs {
            id: CrsId::epsg(4978),
            name: "WGS 84",
            kind: CrsKind::Geocentric,
            axis_order: AxisOrder::EastNorth,
            datum: Datum::WGS84,
            definition: Some("cart"),
            area_of_use: WORLD,
        },
        projected(
            CrsId::epsg(3857),
            "WGS 84 / Pseudo-Mercator",
            Datum::WGS84,
            "webmerc",
            Envelope::new(-180.0, -85.06, 180.0, 85.06),
        ),
        projected(
            CrsId::epsg(32631),
            "WGS 84 / UTM zone 31N",
            Datum::WGS84,
            "utm zone=31",
            Envelope::new(0.0, 0.0, 6.0, 84.0),
        ),
        projected(
            CrsId::epsg(32632),
            "WGS 84 / UTM zone 32N",
            Datum::WGS84,
            "utm zone=32",
            Envelope::new(6.0, 0.0, 12.0, 84.0),
        ),
        geographic(CrsId::epsg(4258), "ETRS89", CrsKind::Geographic2d, AxisOrder::NorthEast, Datum::ETRS89, EUROPE),
        geographic(CrsId::epsg(4937), "ETRS89", CrsKind::Geographic3d, AxisOrder::NorthEast, Datum::ETRS89, EUROPE),
        Crs {
            id: CrsId::epsg(4936),
            name: "ETRS89",
            kind: CrsKind::Geocentric,
            axis_order: AxisOrder::EastNorth,
            datum: Datum::ETRS89,
            definition: Some("cart"),
            area_of_use: EUROPE,
        },
        Crs {
            id: CrsId::epsg(3035),
            name: "ETRS89-extended / LAEA Europe",
            kind: CrsKind::Projected,
            axis_order: AxisOrder::NorthEast,
            datum: Datum::ETRS89,
            definition: Some("laea lat_0=52 lon_0=10 x_0=4321000 y_0=3210000"),
            area_of_use: Envelope::new(-35.58, 24.6, 44.83, 84.73),
        },
        projected(
            CrsId::epsg(25831),
            "ETRS89 / UTM zone 31N",
            Datum::ETRS89,
            "utm zone=31",
            Envelope::new(0.0, 37.0, 6.0, 82.45),
        ),
        projected(
            CrsId::epsg(25832),
            "ETRS89 / UTM zone 32N",
            Datum::ETRS89,
            "utm zone=32",
            Envelope::new(6.0, 38.76, 12.0, 84.33),
        ),
    ];
}

fn geographic(
    id: CrsId,
    name: &'static str,
    kind: CrsKind,
    axis_order: AxisOrder,
    datum: Datum,
    area_of_use: Envelope,
) -> Crs {
    Crs {
        id,
        name,
        kind,
        axis_order,
        datum,
        definition: None,
        area_of_use,
    }
}

fn projected(id: CrsId, name: &'static str, datum: Datum, definition: &'static str, area_of_use: Envelope) -> Crs {
    Crs {
        id,
        name,
        kind: CrsKind::Projected,
        axis_order: AxisOrder::EastNorth,
        datum,
        definition: Some(definition),
        area_of_use,
    }
}

/// All the built-in CRSs.
pub fn all() -> &'static [Crs] {
    &CATALOGUE
}

/// Built-in CRS with the given id.
pub fn find(id: &CrsId) -> Option<&'static Crs> {
    CATALOGUE.iter().find(|crs| &crs.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let all = all();
        for (i, crs) in all.iter().enumerate() {
            assert!(
                all[i + 1..].iter().all(|other| other.id != crs.id),
                "{} listed twice",
                crs.id
            );
        }
    }

    #[test]
    fn geographic_entries_have_no_operator() {
        for crs in all() {
            assert_eq!(crs.kind.is_geographic(), crs.definition.is_none(), "{}", crs.id);
        }
    }

    #[test]
    fn operators_use_the_datum_ellipsoid() {
        assert_eq!(
            find(&CrsId::epsg(25831)).unwrap().operator().unwrap(),
            "utm zone=31 ellps=GRS80"
        );
        assert_eq!(
            find(&CrsId::epsg(4978)).unwrap().operator().unwrap(),
            "cart ellps=WGS84"
        );
        assert_eq!(find(&CrsId::epsg(4326)).unwrap().operator(), None);
        for crs in all() {
            assert!(!crs.definition.unwrap_or_default().contains("ellps"), "{}", crs.id);
        }
    }

    #[test]
    fn lookup() {
        let crs = find(&"urn:ogc:def:crs:EPSG::3035".parse().unwrap()).unwrap();
        assert_eq!(crs.axis_order, AxisOrder::NorthEast);
        assert_eq!(crs.dimensions(), 2);
        assert_eq!(find(&CrsId::epsg(4979)).unwrap().dimensions(), 3);
        assert!(find(&CrsId::epsg(28992)).is_none());
    }
}
