//! HTTP service around the [`geotransform`] pipeline.
//!
//! The API router ([`app::router`]) exposes the CRS catalogue and the `/transform`, `/check-density` and `/densify`
//! operations. The liveness and readiness checks are served by a separate router ([`app::health_router`]) so that
//! they can listen on their own port. All the settings are described by [`config::Settings`].

pub mod app;
pub mod config;
pub mod error;
mod handlers;
