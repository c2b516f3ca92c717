//! Routers of the API and of the health checks.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::map_response;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use geotransform::Pipeline;
use geotransform_types::geo::impls::GeodesyEngine;
use log::warn;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

use crate::config::{CorsOrigins, Settings};
use crate::handlers;

/// Version of the API reported in the `API-Version` header.
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The transformation pipeline.
    pub pipeline: Arc<Pipeline<GeodesyEngine>>,
    /// Public URL of the API without the trailing slash.
    pub base_url: String,
}

impl AppState {
    /// Creates the state from the settings.
    pub fn new(settings: &Settings) -> Self {
        Self {
            pipeline: Arc::new(Pipeline::new(GeodesyEngine::new(), settings.pipeline_config())),
            base_url: settings.base_url().to_string(),
        }
    }
}

async fn add_api_version(mut response: Response) -> Response {
    response.headers_mut().insert(
        HeaderName::from_static("api-version"),
        HeaderValue::from_static(API_VERSION),
    );
    response
}

fn cors_layer(origins: CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers(Any);

    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin '{origin}'");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(origins))
        }
    }
}

/// Router of the API.
pub fn router(state: AppState, settings: &Settings) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::landing_page))
        .route("/conformance", get(handlers::conformance))
        .route("/crss", get(handlers::crs_list))
        .route("/crss/:crs_id", get(handlers::crs_by_id))
        .route(
            "/transform",
            get(handlers::transform_position).post(handlers::transform),
        )
        .route("/check-density", post(handlers::check_density))
        .route("/densify", post(handlers::densify))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(settings.max_size_request_body))
        .layer(TimeoutLayer::new(settings.request_timeout()));

    if let Some(origins) = settings.cors_origins() {
        router = router.layer(cors_layer(origins));
    }

    router.layer(map_response(add_api_version))
}

/// Router of the liveness and readiness checks.
pub fn health_router(state: AppState) -> Router {
    Router::new()
        .route("/liveness", get(handlers::liveness))
        .route("/readiness", get(handlers::readiness))
        .with_state(state)
}
