use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use geotransform::payload::GEOJSON_MEDIA_TYPE;
use geotransform::{CrsInputs, DensityCheckConfig, DensityCheckOutcome, FailedSegment, GeometryTree};
use geotransform_types::geo::{Axis, Crs, CrsId, ProjectionEngine};
use geotransform_types::{Coordinate, Geom};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;

const CONTENT_CRS: &str = "content-crs";
const ACCEPT_CRS: &str = "accept-crs";
const DENSITY_CHECK_RESULT: &str = "density-check-result";
const CRS_CONFLICT: &str = "crs-conflict";

const ACCEPTED_MEDIA_TYPES: [&str; 3] = ["application/json", GEOJSON_MEDIA_TYPE, "application/city+json"];
const WKT_MEDIA_TYPE: &str = "text/plain";

/// Query of `POST /transform`, `/check-density` and `/densify`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransformQuery {
    source_crs: Option<String>,
    target_crs: Option<String>,
    density_check: Option<bool>,
    max_segment_length: Option<f64>,
    max_segment_deviation: Option<f64>,
}

impl TransformQuery {
    fn crs_inputs(&self, headers: &HeaderMap) -> Result<CrsInputs, ApiError> {
        Ok(CrsInputs {
            source_crs: self.source_crs.clone(),
            target_crs: self.target_crs.clone(),
            content_crs: header_string(headers, CONTENT_CRS)?,
            accept_crs: header_string(headers, ACCEPT_CRS)?,
        })
    }

    /// The default length applies only when neither the length nor the deviation is given.
    fn density_config(&self) -> DensityCheckConfig {
        let default = DensityCheckConfig::default();
        let max_segment_length = match (self.max_segment_length, self.max_segment_deviation) {
            (None, None) => default.max_segment_length,
            (length, _) => length,
        };

        DensityCheckConfig {
            enabled: self.density_check.unwrap_or(default.enabled),
            max_segment_length,
            max_segment_deviation: self.max_segment_deviation,
        }
    }
}

/// Query of `GET /transform`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PositionQuery {
    coordinates: String,
    source_crs: Option<String>,
    target_crs: Option<String>,
}

/// Description of a CRS in the catalogue.
#[derive(Debug, Serialize)]
pub struct CrsInfo {
    crs: String,
    name: &'static str,
    type_name: &'static str,
    crs_auth_identifier: String,
    authority: String,
    identifier: String,
    axes: Vec<Axis>,
    nr_of_dimensions: usize,
    datum: &'static str,
}

impl From<&Crs> for CrsInfo {
    fn from(crs: &Crs) -> Self {
        Self {
            crs: crs.id.to_uri(),
            name: crs.name,
            type_name: crs.kind.type_name(),
            crs_auth_identifier: crs.id.to_string(),
            authority: crs.id.authority().to_string(),
            identifier: crs.id.code().to_string(),
            axes: crs.axes(),
            nr_of_dimensions: crs.dimensions(),
            datum: crs.datum.name(),
        }
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Result<Option<String>, ApiError> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::to_string)
                .map_err(|_| ApiError::BadRequest(format!("header {name} is not a valid string")))
        })
        .transpose()
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|err| ApiError::Internal(format!("invalid header value '{value}': {err}")))
}

fn check_media_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let content_type = header_string(headers, header::CONTENT_TYPE.as_str())?.unwrap_or_default();
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if ACCEPTED_MEDIA_TYPES.contains(&media_type.as_str()) {
        Ok(())
    } else {
        Err(ApiError::UnsupportedMediaType(content_type))
    }
}

/// Runs CPU-bound pipeline work outside of the async executor.
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| ApiError::Internal(format!("request processing failed: {err}")))?
}

fn json_response(headers: HeaderMap, media_type: &'static str, body: Value) -> Response {
    (headers, [(header::CONTENT_TYPE, media_type)], Json(body)).into_response()
}

pub async fn landing_page(State(state): State<AppState>) -> Json<Value> {
    let base_url = &state.base_url;
    Json(json!({
        "title": "Coordinate Transformation API",
        "description": "Landing page describing the capabilities of this service",
        "links": [
            {
                "title": "API Landing Page",
                "rel": "self",
                "href": format!("{base_url}/"),
                "type": "application/json"
            },
            {
                "title": "Conformance Declaration as JSON",
                "rel": "http://www.opengis.net/def/rel/ogc/1.0/conformance",
                "href": format!("{base_url}/conformance"),
                "type": "application/json"
            },
            {
                "title": "Supported coordinate reference systems",
                "rel": "data",
                "href": format!("{base_url}/crss"),
                "type": "application/json"
            }
        ]
    }))
}

pub async fn conformance() -> Json<Value> {
    Json(json!({ "conformsTo": [] }))
}

pub async fn crs_list(State(state): State<AppState>) -> Json<Vec<CrsInfo>> {
    Json(state.pipeline.engine().crs_list().iter().map(CrsInfo::from).collect())
}

pub async fn crs_by_id(State(state): State<AppState>, Path(crs_id): Path<String>) -> Result<Json<CrsInfo>, ApiError> {
    let id: CrsId = crs_id
        .parse()
        .map_err(|_| ApiError::CrsNotFound(crs_id.clone()))?;
    let crs = state
        .pipeline
        .engine()
        .crs(&id)
        .ok_or_else(|| ApiError::CrsNotFound(crs_id))?;

    Ok(Json(crs.into()))
}

/// `GET /transform`: transforms one position given as `x,y` or `x,y,z`.
pub async fn transform_position(
    State(state): State<AppState>,
    Query(query): Query<PositionQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let position = parse_position(&query.coordinates)?;

    let inputs = CrsInputs {
        source_crs: query.source_crs,
        target_crs: query.target_crs,
        content_crs: header_string(&headers, CONTENT_CRS)?,
        accept_crs: header_string(&headers, ACCEPT_CRS)?,
    };
    let wkt = header_string(&headers, header::ACCEPT.as_str())?.as_deref() == Some(WKT_MEDIA_TYPE);

    let pipeline = state.pipeline.clone();
    let response = run_blocking(move || Ok(pipeline.transform_position(&position, &inputs)?)).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(CONTENT_CRS, header_value(&response.content_crs_header())?);
    if let Some(conflict) = response.conflict_header() {
        response_headers.insert(CRS_CONFLICT, header_value(&conflict)?);
    }

    let point = match &response.payload {
        GeometryTree::Geometry(geometry) => match geometry.value {
            Geom::Point(point) => point,
            _ => return Err(ApiError::Internal("position was not transformed into a point".to_string())),
        },
        _ => return Err(ApiError::Internal("position was not transformed into a point".to_string())),
    };

    if wkt {
        return Ok((response_headers, [(header::CONTENT_TYPE, WKT_MEDIA_TYPE)], point_wkt(&point)).into_response());
    }

    Ok(json_response(
        response_headers,
        "application/json",
        json!({"type": "Point", "coordinates": point.to_position()}),
    ))
}

/// Parses the `x,y` or `x,y,z` value of the `coordinates` parameter.
fn parse_position(coordinates: &str) -> Result<Vec<f64>, ApiError> {
    let position = coordinates
        .split(',')
        .map(|component| component.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ApiError::BadRequest(format!("invalid coordinates '{coordinates}': {err}")))?;

    if !(2..=3).contains(&position.len()) || position.iter().any(|c| !c.is_finite()) {
        return Err(ApiError::BadRequest(format!(
            "coordinates '{coordinates}' must be two or three comma separated numbers"
        )));
    }

    Ok(position)
}

fn point_wkt(point: &Coordinate) -> String {
    match point.z {
        Some(z) => format!("POINT Z ({} {} {})", point.x, point.y, z),
        None => format!("POINT ({} {})", point.x, point.y),
    }
}

/// `POST /transform`: transforms a GeoJSON or CityJSON document.
pub async fn transform(
    State(state): State<AppState>,
    Query(query): Query<TransformQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    check_media_type(&headers)?;
    let inputs = query.crs_inputs(&headers)?;
    let density = query.density_config();

    let pipeline = state.pipeline.clone();
    let response = run_blocking(move || {
        let payload = GeometryTree::from_slice(&body)?;
        Ok(pipeline.process(payload, &inputs, &density)?)
    })
    .await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(CONTENT_CRS, header_value(&response.content_crs_header())?);
    response_headers.insert(DENSITY_CHECK_RESULT, header_value(response.density_header())?);
    if let Some(conflict) = response.conflict_header() {
        response_headers.insert(CRS_CONFLICT, header_value(&conflict)?);
    }

    let media_type = response.media_type();
    let body = response.into_json()?;
    Ok(json_response(response_headers, media_type, body))
}

/// `POST /check-density`: reports the segments of the document that fail the density check.
pub async fn check_density(
    State(state): State<AppState>,
    Query(query): Query<TransformQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    check_media_type(&headers)?;
    let inputs = query.crs_inputs(&headers)?;
    let config = query.density_config();

    let pipeline = state.pipeline.clone();
    let (report, pair) = run_blocking(move || {
        let payload = GeometryTree::from_slice(&body)?;
        Ok(pipeline.check_density(&payload, &inputs, &config)?)
    })
    .await?;

    match report.outcome {
        DensityCheckOutcome::NotApplicable => Err(ApiError::BadRequest(
            "density check is not applicable, the payload contains only point geometries".to_string(),
        )),
        DensityCheckOutcome::Failure => {
            let mut response_headers = HeaderMap::new();
            response_headers.insert(CONTENT_CRS, header_value(&pair.source.to_uri())?);
            Ok(json_response(
                response_headers,
                "application/json",
                json!({
                    "checkResult": false,
                    "failedLineSegments": failed_segments_collection(&report.failed_segments),
                }),
            ))
        }
        DensityCheckOutcome::Success | DensityCheckOutcome::NotRun => {
            Ok(Json(json!({ "checkResult": true })).into_response())
        }
    }
}

/// Failed segments as a feature collection of two point lines.
fn failed_segments_collection(segments: &[FailedSegment]) -> Value {
    let features: Vec<Value> = segments
        .iter()
        .map(|segment| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": [segment.start.to_position(), segment.end.to_position()],
                },
                "properties": {
                    "path": segment.path,
                    "deviation": segment.deviation,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// `POST /densify`: adds vertices to a GeoJSON document, keeping its CRS.
pub async fn densify(
    State(state): State<AppState>,
    Query(query): Query<TransformQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    check_media_type(&headers)?;
    let inputs = query.crs_inputs(&headers)?;
    let config = query.density_config();

    let pipeline = state.pipeline.clone();
    let (payload, crs, conflicts) = run_blocking(move || {
        let payload = GeometryTree::from_slice(&body)?;
        Ok(pipeline.densify(payload, &inputs, &config)?)
    })
    .await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(CONTENT_CRS, header_value(&crs.to_uri())?);
    if !conflicts.is_empty() {
        let conflicts = conflicts.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        response_headers.insert(CRS_CONFLICT, header_value(&conflicts)?);
    }

    let media_type = payload.media_type();
    Ok(json_response(response_headers, media_type, payload.into_json()?))
}

pub async fn not_found(uri: Uri) -> ApiError {
    let path = uri.path();
    if path != "/" && path.ends_with('/') {
        return ApiError::NotFound(format!(
            "not found, path contains trailing slash, try {}",
            path.trim_end_matches('/')
        ));
    }

    ApiError::NotFound("not found".to_string())
}

pub async fn liveness(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if state.pipeline.engine().crs_list().is_empty() {
        return Err(ApiError::Internal("CRS catalogue is empty".to_string()));
    }
    Ok(Json(json!({ "status": "ok" })))
}

pub async fn readiness() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn positions() {
        assert_eq!(parse_position("5,52").unwrap(), vec![5.0, 52.0]);
        assert_eq!(parse_position("1e5,.5,+3").unwrap(), vec![100_000.0, 0.5, 3.0]);
        assert_eq!(parse_position("-5.25, 52").unwrap(), vec![-5.25, 52.0]);

        for invalid in ["", "5", "1,2,3,4", "a,b", "5,inf", "NaN,1", "5;52"] {
            assert_matches!(parse_position(invalid), Err(ApiError::BadRequest(_)), "{invalid}");
        }
    }

    #[test]
    fn density_parameters() {
        let config = TransformQuery::default().density_config();
        assert_eq!(config, DensityCheckConfig::default());

        let query = TransformQuery {
            max_segment_deviation: Some(0.001),
            ..Default::default()
        };
        let config = query.density_config();
        assert_eq!(config.max_segment_length, None);
        assert_eq!(config.max_segment_deviation, Some(0.001));

        let query = TransformQuery {
            density_check: Some(false),
            max_segment_length: Some(500.0),
            ..Default::default()
        };
        let config = query.density_config();
        assert!(!config.enabled);
        assert_eq!(config.max_segment_length, Some(500.0));
    }
}
