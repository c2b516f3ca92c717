//! Check whether lines and polygon boundaries are dense enough to survive the transformation.
//!
//! A straight segment in the source CRS is usually a curve in the target CRS, but the transformed geometry still
//! connects the transformed vertices with straight segments. For every segment longer than
//! [`DensityCheckConfig::segment_length`], points are placed along it at that spacing and transformed together with
//! the segment ends. If any of them ends up further than [`DensityCheckConfig::segment_deviation`] from the
//! transformed segment, the segment fails. All lengths and deviations are in metres.
//!
//! The length and the deviation are tied by `deviation = 24.15e-9 * length²`, so a caller may give either one.

use std::borrow::Cow;

use geotransform_types::geo::{Crs, CrsKind, ProjectionEngine};
use geotransform_types::{Coordinate, Geom, Segment};
use log::info;
use serde::Serialize;

use crate::error::PipelineError;
use crate::payload::GeometryTree;
use crate::transformer::CoordinateTransformer;
use crate::walker::CoordinatePath;

/// Outcome of the density check for a geometry or for a whole request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityCheckOutcome {
    /// The geometry has no segments.
    NotApplicable,
    /// All segments passed.
    Success,
    /// At least one segment failed.
    Failure,
    /// The check was disabled.
    NotRun,
}

impl DensityCheckOutcome {
    fn rank(self) -> u8 {
        match self {
            DensityCheckOutcome::NotRun => 0,
            DensityCheckOutcome::NotApplicable => 1,
            DensityCheckOutcome::Success => 2,
            DensityCheckOutcome::Failure => 3,
        }
    }

    /// Outcome of two parts together: failure dominates success, which dominates not applicable.
    pub fn combine(self, other: Self) -> Self {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    /// Outcome of a set of geometries. An empty set is not applicable.
    pub fn aggregate(outcomes: impl IntoIterator<Item = Self>) -> Self {
        outcomes
            .into_iter()
            .fold(DensityCheckOutcome::NotApplicable, DensityCheckOutcome::combine)
    }

    /// Value of the `density-check-result` response header.
    pub fn header_value(&self) -> &'static str {
        match self {
            DensityCheckOutcome::NotApplicable => "not-applicable",
            DensityCheckOutcome::Success => "success",
            DensityCheckOutcome::Failure => "failed",
            DensityCheckOutcome::NotRun => "not-run",
        }
    }
}

/// Deviation in metres of a transformed segment per squared metre of its length.
const DEVIATION_PER_SQUARED_LENGTH: f64 = 24.15e-9;

/// Parameters of the density check and of densification.
///
/// At least one of `max_segment_length` and `max_segment_deviation` must be set. The other one is derived from it; if
/// both are set, the deviation decides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityCheckConfig {
    /// If false, the check is not run.
    pub enabled: bool,
    /// Longest segment, in metres, that is accepted without checking.
    pub max_segment_length: Option<f64>,
    /// Largest distance, in metres, a transformed point of a segment may be from the transformed segment.
    pub max_segment_deviation: Option<f64>,
}

impl DensityCheckConfig {
    /// Default for [`DensityCheckConfig::max_segment_length`].
    pub const DEFAULT_MAX_SEGMENT_LENGTH: f64 = 200.0;
    /// Smallest accepted [`DensityCheckConfig::max_segment_length`].
    pub const MIN_MAX_SEGMENT_LENGTH: f64 = 200.0;
    /// Smallest accepted [`DensityCheckConfig::max_segment_deviation`].
    pub const MIN_MAX_SEGMENT_DEVIATION: f64 = 0.0001;

    /// Configuration with the check disabled.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Spacing of the points placed along long segments, in metres.
    pub fn segment_length(&self) -> f64 {
        match (self.max_segment_deviation, self.max_segment_length) {
            (Some(deviation), _) => (deviation / DEVIATION_PER_SQUARED_LENGTH).sqrt(),
            (None, Some(length)) => length,
            (None, None) => Self::DEFAULT_MAX_SEGMENT_LENGTH,
        }
    }

    /// Largest accepted deviation, in metres.
    pub fn segment_deviation(&self) -> f64 {
        self.max_segment_deviation
            .unwrap_or_else(|| DEVIATION_PER_SQUARED_LENGTH * self.segment_length().powi(2))
    }

    /// Returns an error if neither parameter is set or a set one is below its minimum.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_segment_length.is_none() && self.max_segment_deviation.is_none() {
            return Err(PipelineError::InvalidDensityConfig(
                "max-segment-length or max-segment-deviation must be set".to_string(),
            ));
        }

        for (name, value, min) in [
            ("max-segment-length", self.max_segment_length, Self::MIN_MAX_SEGMENT_LENGTH),
            ("max-segment-deviation", self.max_segment_deviation, Self::MIN_MAX_SEGMENT_DEVIATION),
        ] {
            match value {
                Some(value) if !value.is_finite() || value < min => {
                    return Err(PipelineError::InvalidDensityConfig(format!(
                        "{name} must be a number not less than {min}, got {value}"
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl Default for DensityCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_segment_length: Some(Self::DEFAULT_MAX_SEGMENT_LENGTH),
            max_segment_deviation: None,
        }
    }
}

/// A segment whose transformation deviates too much.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedSegment {
    /// Path of the start vertex in the payload.
    pub path: CoordinatePath,
    /// Start vertex in the source CRS.
    pub start: Coordinate,
    /// End vertex in the source CRS.
    pub end: Coordinate,
    /// Largest deviation found, in metres.
    pub deviation: f64,
}

/// Result of the density check of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityReport {
    /// Aggregated outcome.
    pub outcome: DensityCheckOutcome,
    /// All the segments that failed, in document order.
    pub failed_segments: Vec<FailedSegment>,
}

impl DensityReport {
    /// Report of a check that was not run.
    pub fn not_run() -> Self {
        Self {
            outcome: DensityCheckOutcome::NotRun,
            failed_segments: vec![],
        }
    }
}

/// Line or ring of a payload with the information needed to locate its vertices.
#[derive(Debug, Clone)]
pub(crate) struct Line<'a> {
    /// Index of the geometry the line belongs to, in document order.
    pub leaf: usize,
    /// Vertices.
    pub coordinates: Cow<'a, [Coordinate]>,
    /// Path of the line. For GeoJSON the vertex index is appended to get the path of a vertex.
    pub path: CoordinatePath,
    /// CityJSON vertex indices. If set, the path of a vertex is its index in the vertex list.
    pub indices: Option<Vec<usize>>,
    /// Whether the last vertex connects to the first one.
    pub closed: bool,
}

impl Line<'_> {
    /// Pairs of vertex positions forming the segments of the line.
    pub fn segments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.coordinates.len();
        let closing = (self.closed && n > 2).then(|| (n - 1, 0));
        (1..n).map(|i| (i - 1, i)).chain(closing)
    }

    fn vertex_path(&self, i: usize) -> CoordinatePath {
        match &self.indices {
            Some(indices) => vec![indices[i]],
            None => {
                let mut path = self.path.clone();
                path.push(i);
                path
            }
        }
    }
}

/// Lines of a payload and the applicability of the check to each of its geometries.
#[derive(Debug, Default)]
pub(crate) struct Lines<'a> {
    pub lines: Vec<Line<'a>>,
    /// Per geometry in document order: whether it has segments.
    pub leaves: Vec<bool>,
}

impl<'a> Lines<'a> {
    /// Collects the lines of all the geometries of the payload.
    pub fn collect(tree: &'a GeometryTree) -> Result<Self, PipelineError> {
        let mut lines = Lines::default();
        let mut path = vec![];
        match tree {
            GeometryTree::Geometry(geometry) => lines.add_geom(&geometry.value, &mut path),
            GeometryTree::Feature(feature) => match &feature.geometry {
                Some(geometry) => lines.add_geom(&geometry.value, &mut path),
                None => lines.leaves.push(false),
            },
            GeometryTree::FeatureCollection(collection) => {
                for (i, feature) in collection.features.iter().enumerate() {
                    match &feature.geometry {
                        Some(geometry) => {
                            path.push(i);
                            lines.add_geom(&geometry.value, &mut path);
                            path.pop();
                        }
                        None => lines.leaves.push(false),
                    }
                }
            }
            GeometryTree::CityJson(city) => {
                for geometry in city.geometries()? {
                    let leaf = lines.leaves.len();
                    let applicable = geometry.geometry_type.has_segments();
                    lines.leaves.push(applicable);
                    if !applicable {
                        continue;
                    }

                    let closed = geometry.geometry_type.has_rings();
                    for indices in geometry.lines {
                        let coordinates = indices.iter().map(|i| city.vertices[*i]).collect();
                        lines.lines.push(Line {
                            leaf,
                            coordinates: Cow::Owned(coordinates),
                            path: vec![],
                            indices: Some(indices),
                            closed,
                        });
                    }
                }
            }
        }

        Ok(lines)
    }

    fn add_geom(&mut self, geom: &'a Geom, path: &mut Vec<usize>) {
        let leaf = self.leaves.len();
        match geom {
            Geom::Point(_) | Geom::MultiPoint(_) => self.leaves.push(false),
            Geom::LineString(line) => {
                self.leaves.push(true);
                self.add_line(leaf, line, path);
            }
            Geom::MultiLineString(lines) | Geom::Polygon(lines) => {
                self.leaves.push(true);
                self.add_lines(leaf, lines, path);
            }
            Geom::MultiPolygon(polygons) => {
                self.leaves.push(true);
                for (i, polygon) in polygons.iter().enumerate() {
                    path.push(i);
                    self.add_lines(leaf, polygon, path);
                    path.pop();
                }
            }
            Geom::GeometryCollection(children) => {
                for (i, child) in children.iter().enumerate() {
                    path.push(i);
                    self.add_geom(&child.value, path);
                    path.pop();
                }
            }
        }
    }

    fn add_lines(&mut self, leaf: usize, lines: &'a [Vec<Coordinate>], path: &mut Vec<usize>) {
        for (i, line) in lines.iter().enumerate() {
            path.push(i);
            self.add_line(leaf, line, path);
            path.pop();
        }
    }

    fn add_line(&mut self, leaf: usize, line: &'a [Coordinate], path: &[usize]) {
        self.lines.push(Line {
            leaf,
            coordinates: Cow::Borrowed(line),
            path: path.to_vec(),
            indices: None,
            closed: false,
        });
    }
}

/// Segment that is long enough to need checking, and the positions of its points in the transformation batch.
struct PendingSegment {
    line: usize,
    start: usize,
    end: usize,
    batch_offset: usize,
    samples: usize,
}

/// Runs the density check for one request.
pub struct DensityChecker<'a, E: ProjectionEngine + ?Sized> {
    transformer: &'a CoordinateTransformer<'a, E>,
    source: &'a Crs,
    target: &'a Crs,
    config: DensityCheckConfig,
    max_samples: usize,
}

impl<'a, E: ProjectionEngine + ?Sized> DensityChecker<'a, E> {
    /// Creates a new checker. `source` and `target` are the CRSs of the transformer's pair; `max_samples` limits the
    /// number of points one check may transform.
    pub fn new(
        transformer: &'a CoordinateTransformer<'a, E>,
        source: &'a Crs,
        target: &'a Crs,
        config: DensityCheckConfig,
        max_samples: usize,
    ) -> Self {
        Self {
            transformer,
            source,
            target,
            config,
            max_samples,
        }
    }

    /// Checks all the lines and rings of the payload.
    ///
    /// The points of all the segments that need checking are transformed in one batch. Returns
    /// [`DensityCheckOutcome::NotRun`] without looking at the payload if the check is disabled.
    pub fn check(&self, tree: &GeometryTree) -> Result<DensityReport, PipelineError> {
        if !self.config.enabled {
            return Ok(DensityReport::not_run());
        }
        self.config.validate()?;

        let tolerance = self.config.segment_deviation();
        let lines = Lines::collect(tree)?;
        let (batch, pending) = self.sample(&lines.lines)?;
        let transformed = self.transformer.transform(&batch)?;

        let mut failed_leaves = vec![false; lines.leaves.len()];
        let mut failed_segments = vec![];
        for segment in &pending {
            let start = &transformed[segment.batch_offset];
            let end = &transformed[segment.batch_offset + 1];
            let samples =
                &transformed[segment.batch_offset + 2..segment.batch_offset + 2 + segment.samples];
            let deviation = self.deviation(Segment(start, end), samples);

            if deviation > tolerance {
                let line = &lines.lines[segment.line];
                failed_leaves[line.leaf] = true;
                failed_segments.push(FailedSegment {
                    path: line.vertex_path(segment.start),
                    start: line.coordinates[segment.start],
                    end: line.coordinates[segment.end],
                    deviation,
                });
            }
        }

        let outcome = self.outcome(tree, &lines.leaves, &failed_leaves);
        if outcome == DensityCheckOutcome::Failure {
            info!(
                "Density check failed for {} segments ({}), max segment length {} m, max deviation {} m",
                failed_segments.len(),
                self.transformer.pair(),
                self.config.segment_length(),
                tolerance
            );
        }

        Ok(DensityReport {
            outcome,
            failed_segments,
        })
    }

    /// Builds the transformation batch: for every long segment its start, end and intermediate points.
    fn sample(&self, lines: &[Line]) -> Result<(Vec<Coordinate>, Vec<PendingSegment>), PipelineError> {
        let step = self.config.segment_length();
        let mut batch = vec![];
        let mut pending = vec![];

        for (line_index, line) in lines.iter().enumerate() {
            for (start, end) in line.segments() {
                let a = &line.coordinates[start];
                let b = &line.coordinates[end];
                let length = self.source.distance(a, b);
                if length <= step {
                    continue;
                }

                let count = Segment::sample_count(length, step);
                let required = batch.len().saturating_add(count).saturating_add(2);
                if required > self.max_samples {
                    return Err(PipelineError::DensityLimit {
                        required,
                        limit: self.max_samples,
                    });
                }

                pending.push(PendingSegment {
                    line: line_index,
                    start,
                    end,
                    batch_offset: batch.len(),
                    samples: count,
                });
                batch.push(*a);
                batch.push(*b);
                batch.extend(Segment(a, b).samples(length, step));
            }
        }

        Ok((batch, pending))
    }

    /// Largest distance in metres from the points to the segment.
    fn deviation(&self, chord: Segment, points: &[Coordinate]) -> f64 {
        points
            .iter()
            .map(|p| {
                let closest = match self.target.kind {
                    CrsKind::Geocentric => chord.closest_point_3d(p),
                    _ => chord.closest_point(p),
                };
                self.target.distance(p, &closest)
            })
            .fold(0.0, f64::max)
    }

    fn outcome(&self, tree: &GeometryTree, leaves: &[bool], failed: &[bool]) -> DensityCheckOutcome {
        let mut leaf_outcomes = leaves.iter().zip(failed).map(|(applicable, failed)| match (applicable, failed) {
            (false, _) => DensityCheckOutcome::NotApplicable,
            (true, false) => DensityCheckOutcome::Success,
            (true, true) => DensityCheckOutcome::Failure,
        });

        match tree {
            GeometryTree::Geometry(geometry) => geom_outcome(&geometry.value, &mut leaf_outcomes),
            GeometryTree::Feature(_) | GeometryTree::CityJson(_) => {
                DensityCheckOutcome::aggregate(leaf_outcomes)
            }
            GeometryTree::FeatureCollection(collection) => {
                DensityCheckOutcome::aggregate(collection.features.iter().map(|feature| match &feature.geometry {
                    Some(geometry) => geom_outcome(&geometry.value, &mut leaf_outcomes),
                    None => leaf_outcomes.next().unwrap_or(DensityCheckOutcome::NotApplicable),
                }))
            }
        }
    }
}

/// Outcome of a geometry given the outcomes of the leaf geometries in document order. Collections aggregate their
/// children.
fn geom_outcome(
    geom: &Geom,
    leaves: &mut impl Iterator<Item = DensityCheckOutcome>,
) -> DensityCheckOutcome {
    match geom {
        Geom::GeometryCollection(children) => {
            let outcomes: Vec<_> = children.iter().map(|child| geom_outcome(&child.value, leaves)).collect();
            DensityCheckOutcome::aggregate(outcomes)
        }
        _ => leaves.next().unwrap_or(DensityCheckOutcome::NotApplicable),
    }
}
