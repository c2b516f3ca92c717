use ::geodesy::prelude::*;
use log::debug;

use crate::coord::Coordinate;
use crate::envelope::Envelope;
use crate::error::TransformError;
use crate::geo::catalogue;
use crate::geo::crs::{AxisOrder, Crs, CrsId, CrsKind, CrsPair};
use crate::geo::traits::engine::ProjectionEngine;

/// Number of points sampled along each edge of an area of use when projecting it into a CRS.
const DOMAIN_EDGE_SAMPLES: usize = 21;

/// [`ProjectionEngine`] backed by the `geodesy` crate.
///
/// A transformation goes through geographic coordinates: the inverse of the source CRS operator, then the forward
/// target operator, each applied to the whole batch at once.
#[derive(Debug, Clone)]
pub struct GeodesyEngine {
    crs_list: Vec<Crs>,
}

impl GeodesyEngine {
    /// Engine that knows the [built-in CRSs](catalogue).
    pub fn new() -> Self {
        Self::with_crs_list(catalogue::all().to_vec())
    }

    /// Engine that knows only the given CRSs.
    pub fn with_crs_list(crs_list: Vec<Crs>) -> Self {
        Self { crs_list }
    }

    fn get(&self, id: &CrsId) -> Result<&Crs, TransformError> {
        ProjectionEngine::crs(self, id)
            .ok_or_else(|| TransformError::UnknownCrs(id.to_string()))
    }

    fn operator(context: &mut Minimal, crs: &Crs) -> Result<Option<OpHandle>, TransformError> {
        crs.operator()
            .map(|definition| context.op(&definition))
            .transpose()
            .map_err(|err| TransformError::Definition {
                crs: crs.id.to_string(),
                reason: err.to_string(),
            })
    }

    /// Converts geographic coordinates (degrees, east/north order) into the coordinates of the CRS. Returns `None`
    /// for the values the operator cannot represent.
    fn project_geographic(
        &self,
        crs: &Crs,
        lon_lat: &[(f64, f64)],
    ) -> Result<Vec<Option<Coordinate>>, TransformError> {
        let mut context = Minimal::new();
        let op = Self::operator(&mut context, crs)?;
        let mut data: Vec<Coor4D> = lon_lat
            .iter()
            .map(|(lon, lat)| Coor4D([lon.to_radians(), lat.to_radians(), 0.0, 0.0]))
            .collect();

        if let Some(op) = op {
            context
                .apply(op, Fwd, &mut data)
                .map_err(|err| TransformError::Definition {
                    crs: crs.id.to_string(),
                    reason: err.to_string(),
                })?;
        }

        Ok(data
            .iter()
            .map(|c| {
                let (east, north) = match crs.kind {
                    CrsKind::Geographic2d | CrsKind::Geographic3d => (c.0[0].to_degrees(), c.0[1].to_degrees()),
                    CrsKind::Projected | CrsKind::Geocentric => (c.0[0], c.0[1]),
                };
                (east.is_finite() && north.is_finite()).then(|| crs.from_east_north(east, north, None))
            })
            .collect())
    }
}

impl Default for GeodesyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectionEngine for GeodesyEngine {
    fn crs_list(&self) -> &[Crs] {
        &self.crs_list
    }

    fn transform(
        &self,
        pair: &CrsPair,
        coordinates: &[Coordinate],
    ) -> Result<Vec<Coordinate>, TransformError> {
        let source = self.get(&pair.source)?;
        let target = self.get(&pair.target)?;

        let mut data = coordinates
            .iter()
            .enumerate()
            .map(|(index, c)| to_internal(source, index, c))
            .collect::<Result<Vec<_>, _>>()?;

        if pair.is_identity() {
            return Ok(coordinates.to_vec());
        }

        let mut context = Minimal::new();
        let source_op = Self::operator(&mut context, source)?;
        let target_op = Self::operator(&mut context, target)?;

        if let Some(op) = source_op {
            context
                .apply(op, Inv, &mut data)
                .map_err(|err| failed(source, target, err))?;
        }
        if let Some(op) = target_op {
            context
                .apply(op, Fwd, &mut data)
                .map_err(|err| failed(source, target, err))?;
        }

        debug!("Transformed {} coordinates from {pair}", coordinates.len());

        coordinates
            .iter()
            .zip(data.iter())
            .enumerate()
            .map(|(index, (input, output))| from_internal(target, index, input, output))
            .collect()
    }

    fn domain_of(&self, id: &CrsId) -> Result<Envelope, TransformError> {
        let crs = self.get(id)?;
        match crs.kind {
            CrsKind::Geographic2d | CrsKind::Geographic3d => Ok(match crs.axis_order {
                AxisOrder::EastNorth => crs.area_of_use,
                AxisOrder::NorthEast => crs.area_of_use.swap_axes(),
            }),
            CrsKind::Geocentric => Ok(Envelope::unbounded()),
            CrsKind::Projected => {
                let area = crs.area_of_use;
                let n = DOMAIN_EDGE_SAMPLES - 1;
                let mut boundary = Vec::with_capacity(4 * DOMAIN_EDGE_SAMPLES);
                for i in 0..=n {
                    let t = i as f64 / n as f64;
                    let lon = area.x_min + area.width() * t;
                    let lat = area.y_min + area.height() * t;
                    boundary.push((lon, area.y_min));
                    boundary.push((lon, area.y_max));
                    boundary.push((area.x_min, lat));
                    boundary.push((area.x_max, lat));
                }

                let projected: Vec<Coordinate> = self
                    .project_geographic(crs, &boundary)?
                    .into_iter()
                    .flatten()
                    .collect();

                Envelope::from_coordinates(projected.iter()).ok_or_else(|| TransformError::Definition {
                    crs: crs.id.to_string(),
                    reason: "area of use cannot be projected".to_string(),
                })
            }
        }
    }
}

fn to_internal(crs: &Crs, index: usize, c: &Coordinate) -> Result<Coor4D, TransformError> {
    let (east, north) = crs.east_north(c);
    match crs.kind {
        CrsKind::Geographic2d | CrsKind::Geographic3d => Ok(Coor4D([
            east.to_radians(),
            north.to_radians(),
            c.z.unwrap_or(0.0),
            0.0,
        ])),
        CrsKind::Projected => Ok(Coor4D([east, north, c.z.unwrap_or(0.0), 0.0])),
        CrsKind::Geocentric => match c.z {
            Some(z) => Ok(Coor4D([c.x, c.y, z, 0.0])),
            None => Err(dimensions_error(crs, index, c)),
        },
    }
}

fn from_internal(
    crs: &Crs,
    index: usize,
    input: &Coordinate,
    output: &Coor4D,
) -> Result<Coordinate, TransformError> {
    let [a, b, h, _] = output.0;
    let result = match crs.kind {
        CrsKind::Geographic2d | CrsKind::Geographic3d => {
            crs.from_east_north(a.to_degrees(), b.to_degrees(), input.z.map(|_| h))
        }
        CrsKind::Projected => crs.from_east_north(a, b, input.z.map(|_| h)),
        CrsKind::Geocentric => match input.z {
            Some(_) => Coordinate::new_3d(a, b, h),
            None => return Err(dimensions_error(crs, index, input)),
        },
    };

    if result.is_finite() {
        Ok(result)
    } else {
        Err(TransformError::NonFinite(index))
    }
}

fn failed(source: &Crs, target: &Crs, reason: impl std::fmt::Display) -> TransformError {
    TransformError::Failed {
        from: source.id.to_string(),
        to: target.id.to_string(),
        reason: reason.to_string(),
    }
}

fn dimensions_error(crs: &Crs, index: usize, c: &Coordinate) -> TransformError {
    TransformError::Dimensions {
        index,
        found: c.dimensions(),
        expected: crs.dimensions(),
        crs: crs.id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    fn transform(from: CrsId, to: CrsId, coordinates: &[Coordinate]) -> Vec<Coordinate> {
        GeodesyEngine::new()
            .transform(&CrsPair::new(from, to), coordinates)
            .unwrap()
    }

    #[test]
    fn web_mercator() {
        let result = transform(
            CrsId::crs84(),
            CrsId::epsg(3857),
            &[Coordinate::new(180.0, 0.0), Coordinate::new(0.0, 0.0)],
        );
        assert_abs_diff_eq!(result[0].x, 20037508.342789244, epsilon = 1e-6);
        assert_abs_diff_eq!(result[0].y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(result[1].x, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn lat_lon_axis_order() {
        let from_crs84 = transform(CrsId::crs84(), CrsId::epsg(3857), &[Coordinate::new(5.0, 52.0)]);
        let from_4326 = transform(CrsId::epsg(4326), CrsId::epsg(3857), &[Coordinate::new(52.0, 5.0)]);
        assert_abs_diff_eq!(from_crs84[0].x, from_4326[0].x, epsilon = 1e-9);
        assert_abs_diff_eq!(from_crs84[0].y, from_4326[0].y, epsilon = 1e-9);

        let swapped = transform(CrsId::crs84(), CrsId::epsg(4326), &[Coordinate::new(5.0, 52.0)]);
        assert_abs_diff_eq!(swapped[0].x, 52.0, epsilon = 1e-12);
        assert_abs_diff_eq!(swapped[0].y, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn geocentric() {
        let result = transform(
            CrsId::epsg(4979),
            CrsId::epsg(4978),
            &[Coordinate::new_3d(0.0, 0.0, 0.0)],
        );
        assert_abs_diff_eq!(result[0].x, 6378137.0, epsilon = 1e-6);
        assert_abs_diff_eq!(result[0].y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(result[0].z.unwrap(), 0.0, epsilon = 1e-6);

        let back = transform(CrsId::epsg(4978), CrsId::epsg(4979), &result);
        assert_abs_diff_eq!(back[0].x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(back[0].z.unwrap(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn geocentric_requires_height() {
        let engine = GeodesyEngine::new();
        let result = engine.transform(
            &CrsPair::new(CrsId::epsg(4979), CrsId::epsg(4978)),
            &[Coordinate::new_3d(0.0, 0.0, 0.0), Coordinate::new(10.0, 10.0)],
        );
        assert_matches!(result, Err(TransformError::Dimensions { index: 1, found: 2, expected: 3, .. }));
    }

    #[test]
    fn utm_central_meridian() {
        let result = transform(
            CrsId::crs84(),
            CrsId::epsg(32631),
            &[Coordinate::new(3.0, 52.0)],
        );
        assert_abs_diff_eq!(result[0].x, 500_000.0, epsilon = 1e-3);
    }

    #[test]
    fn round_trip_through_utm() {
        let input = [Coordinate::new(4.9, 52.37), Coordinate::new_3d(5.5, 51.4, 42.0)];
        let projected = transform(CrsId::crs84(), CrsId::epsg(32631), &input);
        let back = transform(CrsId::epsg(32631), CrsId::crs84(), &projected);
        for (a, b) in input.iter().zip(back.iter()) {
            assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-8);
            assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-8);
        }
    }

    #[test]
    fn dimensions_are_preserved_per_coordinate() {
        let result = transform(
            CrsId::crs84(),
            CrsId::epsg(3857),
            &[Coordinate::new(1.0, 1.0), Coordinate::new_3d(1.0, 1.0, 12.5)],
        );
        assert_eq!(result[0].z, None);
        assert_eq!(result[1].z, Some(12.5));
    }

    #[test]
    fn identity_returns_input() {
        let input = [Coordinate::new(1.234567891, 2.0)];
        assert_eq!(transform(CrsId::epsg(32631), CrsId::epsg(32631), &input), input.to_vec());
    }

    #[test]
    fn unknown_crs() {
        let engine = GeodesyEngine::new();
        assert_matches!(
            engine.transform(&CrsPair::new(CrsId::crs84(), CrsId::epsg(28992)), &[]),
            Err(TransformError::UnknownCrs(s)) if s == "EPSG:28992"
        );
        assert_matches!(engine.domain_of(&CrsId::epsg(28992)), Err(TransformError::UnknownCrs(_)));
    }

    #[test]
    fn domains() {
        let engine = GeodesyEngine::new();
        assert_eq!(
            engine.domain_of(&CrsId::epsg(4326)).unwrap(),
            Envelope::new(-90.0, -180.0, 90.0, 180.0)
        );
        assert_eq!(
            engine.domain_of(&CrsId::crs84()).unwrap(),
            Envelope::new(-180.0, -90.0, 180.0, 90.0)
        );
        assert_eq!(engine.domain_of(&CrsId::epsg(4978)).unwrap(), Envelope::unbounded());

        let mercator = engine.domain_of(&CrsId::epsg(3857)).unwrap();
        assert_abs_diff_eq!(mercator.x_max, 20037508.342789244, epsilon = 1e-6);
        assert_abs_diff_eq!(mercator.x_min, -20037508.342789244, epsilon = 1e-6);

        let utm = engine.domain_of(&CrsId::epsg(32631)).unwrap();
        assert!(utm.contains(&Coordinate::new(500_000.0, 5_800_000.0)));
        assert!(!utm.contains(&Coordinate::new(500_000.0, -10.0)));
    }
}
