//! Server settings, read from the command line or the environment.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use geotransform::{CrsPrecedence, PipelineConfig, Precision, ResolverConfig};
use geotransform_types::geo::CrsId;
use log::LevelFilter;

/// Settings of the server. Every option can also be given as the environment variable named in its help.
#[derive(Debug, Clone, Parser)]
#[command(name = "geotransform-server", version, about = "Coordinate transformation service for GeoJSON and CityJSON")]
pub struct Settings {
    /// Address to listen on.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port of the API.
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Port of the liveness and readiness checks.
    #[arg(long, env = "HEALTH_PORT", default_value_t = 8001)]
    pub health_port: u16,

    /// Maximum time a request may take, in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECONDS", default_value_t = 10)]
    pub request_timeout_seconds: u64,

    /// Maximum size of a request body, in bytes.
    #[arg(long, env = "MAX_SIZE_REQUEST_BODY", default_value_t = 2_000_000)]
    pub max_size_request_body: usize,

    /// Log level: off, error, warn, info, debug or trace.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,

    /// Number of decimals of output coordinates in metres. Degrees get 5 more.
    #[arg(long, env = "PRECISION", default_value_t = 4)]
    pub precision: u32,

    /// Public URL of the API, used for links.
    #[arg(long, env = "BASE_URL", default_value = "http://localhost:8000/")]
    pub base_url: String,

    /// Origins allowed by CORS: `*` or a comma separated list. CORS is disabled when not set.
    #[arg(long, env = "CORS_ALLOW_ORIGINS")]
    pub cors_allow_origins: Option<String>,

    /// Source CRS of payloads that do not name one.
    #[arg(long, env = "DEFAULT_SOURCE_CRS", default_value = "OGC:CRS84")]
    pub default_source_crs: CrsId,

    /// Which source CRS wins when the request and the payload disagree: explicit or embedded.
    #[arg(long, env = "CRS_PRECEDENCE", default_value = "explicit")]
    pub crs_precedence: CrsPrecedence,

    /// Maximum number of points the density check or densification of one request may create.
    #[arg(long, env = "MAX_DENSITY_SAMPLES", default_value_t = PipelineConfig::DEFAULT_MAX_DENSITY_SAMPLES)]
    pub max_density_samples: usize,
}

/// Origins allowed to make cross-origin requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    /// Any origin.
    Any,
    /// Only the listed ones.
    List(Vec<String>),
}

impl Settings {
    /// Address of the API listener.
    pub fn api_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Address of the health check listener.
    pub fn health_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.health_port).parse()?)
    }

    /// Request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Parsed `cors_allow_origins`, `None` if CORS is disabled.
    pub fn cors_origins(&self) -> Option<CorsOrigins> {
        let value = self.cors_allow_origins.as_deref()?.trim();
        if value.is_empty() {
            return None;
        }
        if value == "*" {
            return Some(CorsOrigins::Any);
        }

        Some(CorsOrigins::List(
            value
                .split(',')
                .map(|origin| origin.trim().trim_end_matches('/').to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        ))
    }

    /// Configuration of the transformation pipeline.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            resolver: ResolverConfig {
                default_source: Some(self.default_source_crs.clone()),
                precedence: self.crs_precedence,
            },
            precision: Precision::new(self.precision),
            max_density_samples: self.max_density_samples,
        }
    }

    /// Base URL without the trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
