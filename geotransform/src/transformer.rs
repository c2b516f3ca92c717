use geotransform_types::geo::{Crs, CrsPair, ProjectionEngine, Unit};
use geotransform_types::{Coordinate, Envelope, TransformError};

use crate::error::PipelineError;

/// Transforms batches of coordinates for one resolved CRS pair.
///
/// Wraps a [`ProjectionEngine`] and checks its output: the result must have one coordinate per input, each with the
/// same number of components, and all of them finite. Anything else fails the whole batch.
pub struct CoordinateTransformer<'a, E: ProjectionEngine + ?Sized> {
    engine: &'a E,
    pair: CrsPair,
}

impl<'a, E: ProjectionEngine + ?Sized> CoordinateTransformer<'a, E> {
    /// Creates a transformer for the pair.
    pub fn new(engine: &'a E, pair: CrsPair) -> Self {
        Self { engine, pair }
    }

    /// The CRS pair.
    pub fn pair(&self) -> &CrsPair {
        &self.pair
    }

    /// Transforms the coordinates from the source into the target CRS.
    ///
    /// When source and target are the same CRS, or the batch is empty, the engine is not called.
    pub fn transform(&self, coordinates: &[Coordinate]) -> Result<Vec<Coordinate>, PipelineError> {
        if coordinates.is_empty() || self.pair.is_identity() {
            return Ok(coordinates.to_vec());
        }

        let result = self.engine.transform(&self.pair, coordinates)?;
        if result.len() != coordinates.len() {
            return Err(PipelineError::StructureMismatch(format!(
                "engine returned {} coordinates for {} inputs",
                result.len(),
                coordinates.len()
            )));
        }

        for (index, (input, output)) in coordinates.iter().zip(result.iter()).enumerate() {
            if input.dimensions() != output.dimensions() {
                return Err(TransformError::Dimensions {
                    index,
                    found: output.dimensions(),
                    expected: input.dimensions(),
                    crs: self.pair.target.to_string(),
                }
                .into());
            }
            if !output.is_finite() {
                return Err(TransformError::NonFinite(index).into());
            }
        }

        Ok(result)
    }

    /// Area of use of the source CRS in its own axis order and units.
    pub fn source_domain(&self) -> Result<Envelope, PipelineError> {
        Ok(self.engine.domain_of(&self.pair.source)?)
    }
}

/// Number of decimals output coordinates are rounded to.
///
/// The value applies to metres. Coordinates in degrees get 5 more decimals, which keeps about the same ground
/// resolution. Heights are always in metres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
    decimals: u32,
}

impl Precision {
    /// Decimals used when none are configured.
    pub const DEFAULT: Precision = Precision { decimals: 4 };

    const DEGREE_EXTRA_DECIMALS: u32 = 5;

    /// Creates a new precision with the given number of decimals for metres.
    pub fn new(decimals: u32) -> Self {
        Self { decimals }
    }

    /// Decimals for metres.
    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// Decimals for the horizontal components of coordinates of the CRS.
    pub fn horizontal_decimals(&self, crs: &Crs) -> u32 {
        match crs.unit() {
            Unit::Degree => self.decimals + Self::DEGREE_EXTRA_DECIMALS,
            Unit::Metre => self.decimals,
        }
    }

    /// Rounds a coordinate of the CRS.
    pub fn round(&self, crs: &Crs, c: &Coordinate) -> Coordinate {
        c.rounded(self.horizontal_decimals(crs), self.decimals)
    }

    /// Scale of CityJSON vertex quantisation for the CRS: millimetres, or about the same in degrees.
    pub fn cityjson_scale(crs: &Crs) -> [f64; 3] {
        match crs.unit() {
            Unit::Degree => [1e-7, 1e-7, 0.001],
            Unit::Metre => [0.001, 0.001, 0.001],
        }
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::TestEngine;
    use assert_matches::assert_matches;
    use geotransform_types::geo::{catalogue, CrsId};

    fn utm_to_mercator() -> CrsPair {
        CrsPair::new(CrsId::epsg(32631), CrsId::epsg(3857))
    }

    #[test]
    fn identity_skips_engine() {
        let engine = TestEngine::affine();
        let transformer = CoordinateTransformer::new(&engine, CrsPair::new(CrsId::epsg(3857), CrsId::epsg(3857)));
        let input = vec![Coordinate::new(1.0, 2.0), Coordinate::new_3d(3.0, 4.0, 5.0)];
        assert_eq!(transformer.transform(&input).unwrap(), input);
        assert_eq!(engine.calls(), 0);
    }

    #[test]
    fn one_engine_call_per_batch() {
        let engine = TestEngine::affine();
        let transformer = CoordinateTransformer::new(&engine, utm_to_mercator());
        let input = vec![Coordinate::new(1.0, 2.0), Coordinate::new_3d(3.0, 4.0, 5.0)];
        let result = transformer.transform(&input).unwrap();
        assert_eq!(result, vec![Coordinate::new(12.0, -1.0), Coordinate::new_3d(16.0, 3.0, 5.0)]);
        assert_eq!(engine.calls(), 1);
    }

    #[test]
    fn batch_equals_single_transforms() {
        let engine = TestEngine::affine();
        let transformer = CoordinateTransformer::new(&engine, utm_to_mercator());
        let input = vec![Coordinate::new(1.0, 2.0), Coordinate::new(7.5, -3.0), Coordinate::new_3d(3.0, 4.0, 5.0)];
        let batch = transformer.transform(&input).unwrap();
        let single: Vec<_> = input
            .iter()
            .map(|c| transformer.transform(&[*c]).unwrap()[0])
            .collect();
        assert_eq!(batch, single);
    }

    #[test]
    fn non_finite_output_fails_the_batch() {
        let engine = TestEngine::with_mapping(|c| {
            if c.x > 100.0 {
                Coordinate::new(f64::NAN, c.y)
            } else {
                *c
            }
        });
        let transformer = CoordinateTransformer::new(&engine, utm_to_mercator());
        let result = transformer.transform(&[Coordinate::new(1.0, 1.0), Coordinate::new(200.0, 1.0)]);
        assert_matches!(result, Err(PipelineError::TransformEngine(TransformError::NonFinite(1))));
    }

    #[test]
    fn dropped_component_fails_the_batch() {
        let engine = TestEngine::with_mapping(|c| Coordinate::new(c.x, c.y));
        let transformer = CoordinateTransformer::new(&engine, utm_to_mercator());
        let result = transformer.transform(&[Coordinate::new_3d(1.0, 1.0, 1.0)]);
        assert_matches!(
            result,
            Err(PipelineError::TransformEngine(TransformError::Dimensions { index: 0, found: 2, expected: 3, .. }))
        );
    }

    #[test]
    fn rounding_depends_on_units() {
        let precision = Precision::new(4);
        let c = Coordinate::new_3d(5.123456789123, 52.987654321987, 12.345678);
        let degrees = precision.round(catalogue::find(&CrsId::crs84()).unwrap(), &c);
        assert_eq!(degrees, Coordinate::new_3d(5.123456789, 52.987654322, 12.3457));
        let metres = precision.round(catalogue::find(&CrsId::epsg(3857)).unwrap(), &c);
        assert_eq!(metres, Coordinate::new_3d(5.1235, 52.9877, 12.3457));
    }
}
