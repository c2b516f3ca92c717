use geotransform_types::geo::{Crs, CrsId, CrsPair, ProjectionEngine};
use geotransform_types::{Coordinate, Geom, Geometry, TransformError};
use log::{error, info};

use crate::bbox::{check_bbox, BBoxCheckOutcome};
use crate::crs_resolver::{CrsConflict, CrsInputs, CrsResolver, ResolvedCrs, ResolverConfig};
use crate::densify::Densifier;
use crate::density::{DensityCheckConfig, DensityChecker, DensityReport};
use crate::error::{PayloadError, PipelineError};
use crate::payload::GeometryTree;
use crate::response::{assemble, TransformResponse};
use crate::transformer::{CoordinateTransformer, Precision};
use crate::walker::{flatten, transform_tree};

/// Configuration of a [`Pipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// CRS resolution rules.
    pub resolver: ResolverConfig,
    /// Rounding of output coordinates.
    pub precision: Precision,
    /// Largest number of points the density check or densification of one request may create.
    pub max_density_samples: usize,
}

impl PipelineConfig {
    /// Default for [`PipelineConfig::max_density_samples`].
    pub const DEFAULT_MAX_DENSITY_SAMPLES: usize = 1_000_000;
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            precision: Precision::default(),
            max_density_samples: Self::DEFAULT_MAX_DENSITY_SAMPLES,
        }
    }
}

/// Transforms payloads from one CRS into another, validating them on the way.
///
/// A request goes through these steps, each of which can stop it:
/// 1. the source and target CRS are resolved from the request and the payload,
/// 2. every coordinate is checked against the area of use of the source CRS,
/// 3. the density check decides whether lines and rings keep their shape (this one only reports),
/// 4. all coordinates are transformed in one batch and written back into the payload.
///
/// Nothing is transformed before the first two steps pass. The pipeline holds no per-request state, so one instance
/// can serve any number of requests.
pub struct Pipeline<E: ProjectionEngine> {
    engine: E,
    config: PipelineConfig,
}

impl<E: ProjectionEngine> Pipeline<E> {
    /// Creates a new pipeline.
    pub fn new(engine: E, config: PipelineConfig) -> Self {
        Self { engine, config }
    }

    /// The projection engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Transforms the payload into the target CRS.
    pub fn process(
        &self,
        payload: GeometryTree,
        inputs: &CrsInputs,
        density: &DensityCheckConfig,
    ) -> Result<TransformResponse, PipelineError> {
        let resolved = self.resolver().resolve(inputs, &payload)?;
        self.run(payload, resolved, density)
    }

    /// Runs only the density check of [`Pipeline::process`], after the domain check. Returns the report together with
    /// the resolved CRS pair.
    ///
    /// The check runs even if `config.enabled` is false, since that is the only thing asked for.
    pub fn check_density(
        &self,
        payload: &GeometryTree,
        inputs: &CrsInputs,
        config: &DensityCheckConfig,
    ) -> Result<(DensityReport, CrsPair), PipelineError> {
        let resolved = self.resolver().resolve(inputs, payload)?;
        let (source, target) = (self.crs(&resolved.pair.source)?, self.crs(&resolved.pair.target)?);
        let transformer = CoordinateTransformer::new(&self.engine, resolved.pair.clone());

        if let BBoxCheckOutcome::Failed(violation) = self.check_domain(payload, &transformer)? {
            return Err(PipelineError::BBoxDomain(violation));
        }

        let config = DensityCheckConfig {
            enabled: true,
            ..*config
        };
        let report =
            DensityChecker::new(&transformer, source, target, config, self.config.max_density_samples).check(payload)?;
        Ok((report, resolved.pair))
    }

    /// Adds vertices to the lines and rings of the payload so that no segment is longer than
    /// [`DensityCheckConfig::segment_length`] metres. The payload stays in its source CRS, which is returned together
    /// with it. `config.enabled` is ignored.
    pub fn densify(
        &self,
        payload: GeometryTree,
        inputs: &CrsInputs,
        config: &DensityCheckConfig,
    ) -> Result<(GeometryTree, CrsId, Vec<CrsConflict>), PipelineError> {
        config.validate()?;
        let (source, conflicts) = self.resolver().resolve_source(inputs, &payload)?;

        let domain = self.engine.domain_of(&source.id)?;
        if let BBoxCheckOutcome::Failed(violation) = check_bbox(&flatten(&payload), &domain) {
            info!("Densification rejected: {violation}");
            return Err(PipelineError::BBoxDomain(violation));
        }

        let densified =
            Densifier::new(source, config.segment_length(), self.config.max_density_samples).densify(payload)?;
        Ok((densified, source.id.clone(), conflicts))
    }

    /// Transforms a single position given as its components. The number of components must match the source CRS.
    ///
    /// The result payload is a GeoJSON point.
    pub fn transform_position(
        &self,
        position: &[f64],
        inputs: &CrsInputs,
    ) -> Result<TransformResponse, PipelineError> {
        let coordinate = Coordinate::from_position(position)?;
        let payload = GeometryTree::from(Geometry::new(Geom::Point(coordinate)));

        let resolved = self.resolver().resolve(inputs, &payload)?;
        let source = self.crs(&resolved.pair.source)?;
        if coordinate.dimensions() != source.dimensions() {
            return Err(PayloadError::Dimensions {
                found: coordinate.dimensions(),
                expected: source.dimensions(),
                crs: source.id.to_string(),
            }
            .into());
        }

        self.run(payload, resolved, &DensityCheckConfig::disabled())
    }

    fn run(
        &self,
        payload: GeometryTree,
        resolved: ResolvedCrs,
        density: &DensityCheckConfig,
    ) -> Result<TransformResponse, PipelineError> {
        let (source, target) = (self.crs(&resolved.pair.source)?, self.crs(&resolved.pair.target)?);
        let transformer = CoordinateTransformer::new(&self.engine, resolved.pair.clone());

        let bbox = self.check_domain(&payload, &transformer)?;
        if !bbox.is_passed() {
            return assemble(payload, bbox, DensityReport::not_run(), resolved);
        }

        let density = DensityChecker::new(
            &transformer,
            source,
            target,
            *density,
            self.config.max_density_samples,
        )
        .check(&payload)
        .map_err(log_engine_error)?;

        let transformed =
            transform_tree(payload, &transformer, target, self.config.precision).map_err(log_engine_error)?;

        assemble(transformed, bbox, density, resolved)
    }

    fn check_domain(
        &self,
        payload: &GeometryTree,
        transformer: &CoordinateTransformer<'_, E>,
    ) -> Result<BBoxCheckOutcome, PipelineError> {
        let outcome = check_bbox(&flatten(payload), &transformer.source_domain()?);
        if let BBoxCheckOutcome::Failed(violation) = &outcome {
            info!("Request for {} rejected: {violation}", transformer.pair());
        }

        Ok(outcome)
    }

    fn resolver(&self) -> CrsResolver<'_, E> {
        CrsResolver::new(&self.engine, &self.config.resolver)
    }

    fn crs(&self, id: &CrsId) -> Result<&Crs, PipelineError> {
        self.engine
            .crs(id)
            .ok_or_else(|| TransformError::UnknownCrs(id.to_string()).into())
    }
}

fn log_engine_error(err: PipelineError) -> PipelineError {
    if let PipelineError::TransformEngine(engine_error) = &err {
        error!("Projection engine failed: {engine_error}");
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBoxViolation;
    use crate::crs_resolver::CrsOrigin;
    use crate::density::DensityCheckOutcome;
    use crate::tests::{collection_tree, TestEngine};
    use crate::walker;
    use assert_matches::assert_matches;
    use geotransform_types::{Envelope, JsonObject};
    use serde_json::json;

    fn pipeline(engine: TestEngine) -> Pipeline<TestEngine> {
        Pipeline::new(engine, PipelineConfig::default())
    }

    fn inputs(source: &str, target: &str) -> CrsInputs {
        CrsInputs::new(Some(source), Some(target))
    }

    #[test]
    fn bbox_failure_stops_before_transformation() {
        let pipeline = pipeline(TestEngine::affine().with_domain(Envelope::new(0.0, 0.0, 6.0, 84.0)));
        let payload = GeometryTree::from(Geometry::new(Geom::MultiPoint(vec![
            Coordinate::new(3.0, 50.0),
            Coordinate::new(7.0, 60.0),
            Coordinate::new(700.0, 600.0),
        ])));

        let result = pipeline.process(
            payload,
            &inputs("EPSG:32631", "EPSG:3857"),
            &DensityCheckConfig::default(),
        );
        assert_eq!(
            result,
            Err(PipelineError::BBoxDomain(BBoxViolation {
                coordinate: Coordinate::new(7.0, 60.0),
                path: vec![1],
                envelope: Envelope::new(0.0, 0.0, 6.0, 84.0),
            }))
        );
        assert_eq!(pipeline.engine().calls(), 0);
    }

    #[test]
    fn first_coordinate_outside_stops_the_request() {
        let pipeline = pipeline(TestEngine::affine().with_domain(Envelope::new(0.0, 0.0, 6.0, 84.0)));
        let payload = GeometryTree::from(Geometry::new(Geom::LineString(vec![
            Coordinate::new(7.0, 60.0),
            Coordinate::new(1e6, -1e6),
        ])));

        let result = pipeline.process(
            payload.clone(),
            &inputs("EPSG:32631", "EPSG:3857"),
            &DensityCheckConfig::default(),
        );
        assert_matches!(
            result,
            Err(PipelineError::BBoxDomain(violation))
                if violation.coordinate == Coordinate::new(7.0, 60.0) && violation.path == vec![0]
        );

        assert_matches!(
            pipeline.check_density(&payload, &inputs("EPSG:32631", "EPSG:3857"), &DensityCheckConfig::default()),
            Err(PipelineError::BBoxDomain(_))
        );
        assert_matches!(
            pipeline.densify(payload, &inputs("EPSG:32631", "EPSG:3857"), &DensityCheckConfig::default()),
            Err(PipelineError::BBoxDomain(_))
        );
        assert_eq!(pipeline.engine().calls(), 0);
        assert_eq!(pipeline.engine().transformed_count(), 0);
    }

    #[test]
    fn same_source_and_target_changes_nothing() {
        let pipeline = pipeline(TestEngine::affine());
        let response = pipeline
            .process(
                collection_tree(),
                &inputs("EPSG:3857", "urn:ogc:def:crs:EPSG::3857"),
                &DensityCheckConfig::default(),
            )
            .unwrap();

        assert_eq!(response.payload, collection_tree());
        assert_eq!(response.density.outcome, DensityCheckOutcome::Success);
        assert_eq!(pipeline.engine().calls(), 0);
    }

    #[test]
    fn transforms_with_one_call_and_keeps_dimensions() {
        let pipeline = pipeline(TestEngine::affine());
        let response = pipeline
            .process(
                collection_tree(),
                &inputs("EPSG:3857", "EPSG:32631"),
                &DensityCheckConfig::disabled(),
            )
            .unwrap();

        assert_eq!(pipeline.engine().calls(), 1);
        assert_eq!(response.crs, CrsPair::new(CrsId::epsg(3857), CrsId::epsg(32631)));
        assert_eq!(response.density_header(), "not-run");

        let before = walker::flatten(&collection_tree());
        let after = walker::flatten(&response.payload);
        assert_eq!(before.paths, after.paths);
        for (input, output) in before.coordinates.iter().zip(&after.coordinates) {
            assert_eq!(output, &TestEngine::affine_map(input));
        }
    }

    #[test]
    fn density_failure_still_returns_payload() {
        let pipeline = pipeline(TestEngine::bulging());
        let payload = GeometryTree::from(Geometry::new(Geom::LineString(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 400.0),
        ])));

        let response = pipeline
            .process(payload, &inputs("EPSG:32631", "EPSG:32632"), &DensityCheckConfig::default())
            .unwrap();
        assert_eq!(response.density.outcome, DensityCheckOutcome::Failure);
        assert_eq!(response.density.failed_segments.len(), 1);
        assert_matches!(response.payload, GeometryTree::Geometry(Geometry { value: Geom::LineString(ref line), .. }) if line.len() == 2);
        // One call for the density samples, one for the payload.
        assert_eq!(pipeline.engine().calls(), 2);
    }

    #[test]
    fn conflicts_reach_the_response() {
        let pipeline = pipeline(TestEngine::affine());
        let mut members = JsonObject::new();
        members.insert(
            "crs".to_string(),
            json!({"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32632"}}),
        );
        let payload = GeometryTree::Geometry(Geometry {
            value: Geom::Point(Coordinate::new(1.0, 2.0)),
            bbox: None,
            foreign_members: Some(members),
        });

        let response = pipeline
            .process(payload, &inputs("EPSG:32631", "EPSG:3857"), &DensityCheckConfig::default())
            .unwrap();
        assert_eq!(response.crs.source, CrsId::epsg(32631));
        assert_eq!(response.conflicts.len(), 1);
        assert_eq!(response.conflicts[0].ignored_origin, CrsOrigin::Embedded);
        assert_eq!(response.density.outcome, DensityCheckOutcome::NotApplicable);

        let GeometryTree::Geometry(geometry) = response.payload else {
            panic!("expected geometry");
        };
        assert_eq!(
            geometry.foreign_members.unwrap()["crs"]["properties"]["name"],
            "urn:ogc:def:crs:EPSG::3857"
        );
    }

    #[test]
    fn single_position() {
        let pipeline = pipeline(TestEngine::affine());
        let response = pipeline
            .transform_position(&[1.0, 2.0], &inputs("EPSG:32631", "EPSG:3857"))
            .unwrap();
        assert_eq!(
            response.payload,
            GeometryTree::from(Geometry::new(Geom::Point(Coordinate::new(12.0, -1.0))))
        );

        assert_eq!(
            pipeline.transform_position(&[1.0, 2.0, 3.0], &inputs("EPSG:32631", "EPSG:3857")),
            Err(PipelineError::InvalidPayload(PayloadError::Dimensions {
                found: 3,
                expected: 2,
                crs: "EPSG:32631".to_string(),
            }))
        );
        assert_matches!(
            pipeline.transform_position(&[1.0], &inputs("EPSG:32631", "EPSG:3857")),
            Err(PipelineError::InvalidPayload(_))
        );
    }

    #[test]
    fn density_only() {
        let pipeline = pipeline(TestEngine::bulging());
        let payload = GeometryTree::from(Geometry::new(Geom::LineString(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 400.0),
        ])));

        let (report, pair) = pipeline
            .check_density(&payload, &inputs("EPSG:32631", "EPSG:32632"), &DensityCheckConfig::disabled())
            .unwrap();
        assert_eq!(pair.source, CrsId::epsg(32631));
        assert_eq!(report.outcome, DensityCheckOutcome::Failure);
        assert_eq!(report.failed_segments[0].start, Coordinate::new(0.0, 0.0));
    }

    #[test]
    fn densify_stays_in_source_crs() {
        let pipeline = pipeline(TestEngine::affine());
        let payload = GeometryTree::from(Geometry::new(Geom::LineString(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 400.0),
        ])));

        let inputs = CrsInputs::new(Some("EPSG:32631"), None);
        let (densified, crs, conflicts) = pipeline
            .densify(payload.clone(), &inputs, &DensityCheckConfig::default())
            .unwrap();
        assert_eq!(crs, CrsId::epsg(32631));
        assert!(conflicts.is_empty());
        assert_eq!(walker::flatten(&densified).coordinates.len(), 3);
        assert_eq!(pipeline.engine().calls(), 0);

        let too_short = DensityCheckConfig {
            max_segment_length: Some(150.0),
            ..Default::default()
        };
        assert_matches!(
            pipeline.densify(payload, &inputs, &too_short),
            Err(PipelineError::InvalidDensityConfig(_))
        );
    }

    #[test]
    fn densify_by_deviation() {
        let pipeline = pipeline(TestEngine::affine());
        let payload = GeometryTree::from(Geometry::new(Geom::LineString(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 1000.0),
        ])));
        let config = DensityCheckConfig {
            enabled: true,
            max_segment_length: None,
            max_segment_deviation: Some(0.0001),
        };

        let (densified, _, _) = pipeline
            .densify(payload, &CrsInputs::new(Some("EPSG:32631"), None), &config)
            .unwrap();
        // 0.0001 m of deviation allows segments of 64.3 m.
        assert_eq!(walker::flatten(&densified).coordinates.len(), 17);
    }
}
