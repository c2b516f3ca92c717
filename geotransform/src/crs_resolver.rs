//! Determines which CRS pair applies to a request.
//!
//! The source CRS can come from four places. From highest to lowest priority they are the `source-crs` parameter, the
//! `content-crs` header, the CRS declared inside the payload and the configured default. The order of the first two
//! and the embedded declaration can be swapped with [`CrsPrecedence::Embedded`]. The target CRS comes from the
//! `target-crs` parameter or the `accept-crs` header and is mandatory.
//!
//! Whenever two of the given values disagree, the one with the higher priority is used and a [`CrsConflict`] is
//! recorded so that the caller can see that something was ignored.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use geotransform_types::geo::{Crs, CrsId, CrsPair, ProjectionEngine};
use log::{debug, warn};
use serde_json::Value;

use crate::error::CrsResolutionError;
use crate::payload::GeometryTree;

/// CRS values given with a request, as raw strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrsInputs {
    /// `source-crs` query parameter.
    pub source_crs: Option<String>,
    /// `target-crs` query parameter.
    pub target_crs: Option<String>,
    /// `content-crs` header.
    pub content_crs: Option<String>,
    /// `accept-crs` header.
    pub accept_crs: Option<String>,
}

impl CrsInputs {
    /// Inputs with the given `source-crs` and `target-crs` parameters.
    pub fn new(source_crs: Option<&str>, target_crs: Option<&str>) -> Self {
        Self {
            source_crs: source_crs.map(str::to_string),
            target_crs: target_crs.map(str::to_string),
            ..Default::default()
        }
    }
}

/// Which source CRS wins when the request names one and the payload declares another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CrsPrecedence {
    /// The `source-crs` parameter or `content-crs` header.
    #[default]
    Explicit,
    /// The CRS declared in the payload.
    Embedded,
}

impl FromStr for CrsPrecedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "explicit" => Ok(Self::Explicit),
            "embedded" => Ok(Self::Embedded),
            _ => Err(format!("unknown CRS precedence '{s}', expected 'explicit' or 'embedded'")),
        }
    }
}

/// Configuration of the [`CrsResolver`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverConfig {
    /// Source CRS used when nothing else names one.
    pub default_source: Option<CrsId>,
    /// Precedence between the request and the payload.
    pub precedence: CrsPrecedence,
}

/// Where a CRS value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsOrigin {
    /// `source-crs` query parameter.
    SourceParameter,
    /// `content-crs` header.
    ContentCrsHeader,
    /// `target-crs` query parameter.
    TargetParameter,
    /// `accept-crs` header.
    AcceptCrsHeader,
    /// Declaration inside the payload.
    Embedded,
    /// Configured default.
    Default,
}

impl Display for CrsOrigin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CrsOrigin::SourceParameter => "source-crs",
            CrsOrigin::ContentCrsHeader => "content-crs",
            CrsOrigin::TargetParameter => "target-crs",
            CrsOrigin::AcceptCrsHeader => "accept-crs",
            CrsOrigin::Embedded => "embedded crs",
            CrsOrigin::Default => "default crs",
        };
        f.write_str(name)
    }
}

/// Two inputs named different CRSs. The first one was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrsConflict {
    /// CRS that was used.
    pub used: CrsId,
    /// Where the used CRS came from.
    pub used_origin: CrsOrigin,
    /// CRS that was ignored.
    pub ignored: CrsId,
    /// Where the ignored CRS came from.
    pub ignored_origin: CrsOrigin,
}

impl Display for CrsConflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} used instead of {} {}",
            self.used_origin, self.used, self.ignored_origin, self.ignored
        )
    }
}

/// Result of the CRS resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCrs {
    /// Source and target CRS.
    pub pair: CrsPair,
    /// Where the source CRS came from.
    pub source_origin: CrsOrigin,
    /// Where the target CRS came from.
    pub target_origin: CrsOrigin,
    /// Inputs that were ignored.
    pub conflicts: Vec<CrsConflict>,
}

#[derive(Debug, Clone)]
struct Candidate {
    id: CrsId,
    raw: String,
    origin: CrsOrigin,
}

impl Candidate {
    fn parse(raw: &str, origin: CrsOrigin) -> Result<Self, CrsResolutionError> {
        let id = raw
            .parse()
            .map_err(|_| CrsResolutionError::InvalidIdentifier(raw.to_string()))?;
        Ok(Self {
            id,
            raw: raw.to_string(),
            origin,
        })
    }

    fn from_input(raw: &Option<String>, origin: CrsOrigin) -> Result<Option<Self>, CrsResolutionError> {
        raw.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Self::parse(s, origin))
            .transpose()
    }
}

/// Returns the first candidate if there is one, recording a conflict when the second one names a different CRS.
fn pick(
    preferred: Option<Candidate>,
    other: Option<Candidate>,
    conflicts: &mut Vec<CrsConflict>,
) -> Option<Candidate> {
    match (preferred, other) {
        (Some(preferred), Some(other)) => {
            if preferred.id != other.id {
                let conflict = CrsConflict {
                    used: preferred.id.clone(),
                    used_origin: preferred.origin,
                    ignored: other.id,
                    ignored_origin: other.origin,
                };
                warn!("CRS conflict: {conflict}");
                conflicts.push(conflict);
            }
            Some(preferred)
        }
        (preferred, other) => preferred.or(other),
    }
}

/// Reads the CRS declared inside the payload.
///
/// For GeoJSON this is the `crs` member of the top level object and, in feature collections, of the features. All the
/// declarations must name the same CRS. For CityJSON it is `metadata.referenceSystem`.
fn embedded_candidate(tree: &GeometryTree) -> Result<Option<Candidate>, CrsResolutionError> {
    let declarations: Vec<&Value> = match tree {
        GeometryTree::CityJson(city) => return city.reference_system().map(candidate_from_value).transpose(),
        GeometryTree::FeatureCollection(collection) => collection
            .foreign_members
            .iter()
            .chain(collection.features.iter().filter_map(|f| f.foreign_members.as_ref()))
            .filter_map(|members| members.get(CRS_MEMBER))
            .collect(),
        _ => tree
            .foreign_members()
            .and_then(|members| members.get(CRS_MEMBER))
            .into_iter()
            .collect(),
    };

    let mut result: Option<Candidate> = None;
    for declaration in declarations {
        let candidate = candidate_from_value(declaration)?;
        match &result {
            Some(first) if first.id != candidate.id => {
                return Err(CrsResolutionError::InconsistentEmbeddedCrs {
                    first: first.raw.clone(),
                    other: candidate.raw,
                })
            }
            Some(_) => {}
            None => result = Some(candidate),
        }
    }

    Ok(result)
}

const CRS_MEMBER: &str = "crs";

/// Accepts a plain string (CityJSON) or a GeoJSON named CRS object.
fn candidate_from_value(value: &Value) -> Result<Candidate, CrsResolutionError> {
    let name = match value {
        Value::String(name) => Some(name.as_str()),
        Value::Object(object) => object
            .get("properties")
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str),
        _ => None,
    };

    match name {
        Some(name) => Candidate::parse(name, CrsOrigin::Embedded),
        None => Err(CrsResolutionError::InvalidIdentifier(value.to_string())),
    }
}

/// Resolves the CRS pair of requests against the CRSs a projection engine supports.
pub struct CrsResolver<'a, E: ProjectionEngine + ?Sized> {
    engine: &'a E,
    config: &'a ResolverConfig,
}

impl<'a, E: ProjectionEngine + ?Sized> CrsResolver<'a, E> {
    /// Creates a new resolver.
    pub fn new(engine: &'a E, config: &'a ResolverConfig) -> Self {
        Self { engine, config }
    }

    /// Resolves the source and target CRS of a request.
    ///
    /// Both CRSs must be known to the engine, and the target cannot have more dimensions than the source.
    pub fn resolve(&self, inputs: &CrsInputs, tree: &GeometryTree) -> Result<ResolvedCrs, CrsResolutionError> {
        let mut conflicts = vec![];

        let target = pick(
            Candidate::from_input(&inputs.target_crs, CrsOrigin::TargetParameter)?,
            Candidate::from_input(&inputs.accept_crs, CrsOrigin::AcceptCrsHeader)?,
            &mut conflicts,
        )
        .ok_or(CrsResolutionError::MissingTarget)?;
        let target_crs = self.lookup(&target)?;

        let (source, source_crs) = self.source(inputs, tree, &mut conflicts)?;

        if target_crs.dimensions() > source_crs.dimensions() {
            return Err(CrsResolutionError::DimensionMismatch {
                from: source.id.to_string(),
                from_dimensions: source_crs.dimensions(),
                to: target.id.to_string(),
                to_dimensions: target_crs.dimensions(),
            });
        }

        let resolved = ResolvedCrs {
            pair: CrsPair::new(source.id, target.id),
            source_origin: source.origin,
            target_origin: target.origin,
            conflicts,
        };
        debug!(
            "Resolved CRS pair {} (source from {}, target from {})",
            resolved.pair, resolved.source_origin, resolved.target_origin
        );

        Ok(resolved)
    }

    /// Resolves only the source CRS, for operations that leave the payload in its own CRS.
    pub fn resolve_source(
        &self,
        inputs: &CrsInputs,
        tree: &GeometryTree,
    ) -> Result<(&'a Crs, Vec<CrsConflict>), CrsResolutionError> {
        let mut conflicts = vec![];
        let (source, crs) = self.source(inputs, tree, &mut conflicts)?;
        debug!("Resolved source CRS {} from {}", source.id, source.origin);

        Ok((crs, conflicts))
    }

    fn source(
        &self,
        inputs: &CrsInputs,
        tree: &GeometryTree,
        conflicts: &mut Vec<CrsConflict>,
    ) -> Result<(Candidate, &'a Crs), CrsResolutionError> {
        let explicit = pick(
            Candidate::from_input(&inputs.source_crs, CrsOrigin::SourceParameter)?,
            Candidate::from_input(&inputs.content_crs, CrsOrigin::ContentCrsHeader)?,
            conflicts,
        );
        let embedded = embedded_candidate(tree)?;

        let source = match self.config.precedence {
            CrsPrecedence::Explicit => pick(explicit, embedded, conflicts),
            CrsPrecedence::Embedded => pick(embedded, explicit, conflicts),
        };

        let source = source
            .or_else(|| {
                self.config.default_source.as_ref().map(|id| Candidate {
                    id: id.clone(),
                    raw: id.to_string(),
                    origin: CrsOrigin::Default,
                })
            })
            .ok_or(CrsResolutionError::MissingSource)?;

        let crs = self.lookup(&source)?;
        Ok((source, crs))
    }

    fn lookup(&self, candidate: &Candidate) -> Result<&'a Crs, CrsResolutionError> {
        self.engine
            .crs(&candidate.id)
            .ok_or_else(|| CrsResolutionError::UnknownCrs(candidate.raw.clone()))
    }
}
