//! Errors returned by the HTTP handlers, rendered as `application/problem+json` documents.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use geotransform::{CrsResolutionError, PayloadError, PipelineError};
use log::{debug, error};
use serde::Serialize;
use thiserror::Error;

/// Media type of error responses.
pub const PROBLEM_MEDIA_TYPE: &str = "application/problem+json";

/// Error of an API request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The pipeline rejected the request.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// The request body has a media type that is not accepted.
    #[error("media type '{0}' is not supported, use application/json, application/geo+json or application/city+json")]
    UnsupportedMediaType(String),
    /// A request parameter is invalid.
    #[error("{0}")]
    BadRequest(String),
    /// The CRS is not in the catalogue.
    #[error("CRS {0} not found")]
    CrsNotFound(String),
    /// No route matches the path.
    #[error("{0}")]
    NotFound(String),
    /// Unexpected failure.
    #[error("{0}")]
    Internal(String),
}

impl From<PayloadError> for ApiError {
    fn from(value: PayloadError) -> Self {
        Self::Pipeline(value.into())
    }
}

impl From<CrsResolutionError> for ApiError {
    fn from(value: CrsResolutionError) -> Self {
        Self::Pipeline(value.into())
    }
}

/// RFC 7807 problem document.
#[derive(Debug, Serialize)]
struct Problem {
    #[serde(rename = "type")]
    problem_type: &'static str,
    title: &'static str,
    status: u16,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    coordinate: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    envelope: Option<Vec<f64>>,
}

impl ApiError {
    /// HTTP status of the error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Pipeline(err) => match err {
                PipelineError::TransformEngine(engine) if !engine.is_input_error() => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                PipelineError::StructureMismatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::CrsNotFound(_) | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        } else {
            debug!("Request rejected: {self}");
        }

        let (coordinate, envelope) = match &self {
            ApiError::Pipeline(PipelineError::BBoxDomain(violation)) => (
                Some(violation.coordinate.to_position()),
                Some(violation.envelope.to_vec()),
            ),
            _ => (None, None),
        };

        let problem = Problem {
            problem_type: "about:blank",
            title: status.canonical_reason().unwrap_or("Error"),
            status: status.as_u16(),
            detail: self.to_string(),
            coordinate,
            envelope,
        };

        (
            status,
            [(header::CONTENT_TYPE, PROBLEM_MEDIA_TYPE)],
            Json(problem),
        )
            .into_response()
    }
}
