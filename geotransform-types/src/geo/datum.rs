/// Geodetic datum: the reference ellipsoid the geographic coordinates of a CRS refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datum {
    name: &'static str,
    ellipsoid: &'static str,
}

impl Datum {
    /// World Geodetic System 1984.
    pub const WGS84: Self = Datum {
        name: "World Geodetic System 1984",
        ellipsoid: "WGS84",
    };

    /// European Terrestrial Reference System 1989.
    pub const ETRS89: Self = Datum {
        name: "European Terrestrial Reference System 1989",
        ellipsoid: "GRS80",
    };

    /// Full name of the datum.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name of the ellipsoid as `geodesy` operators expect it in the `ellps` parameter.
    pub fn ellipsoid(&self) -> &'static str {
        self.ellipsoid
    }
}

impl Default for Datum {
    fn default() -> Self {
        Self::WGS84
    }
}
