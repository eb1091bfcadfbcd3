//! HTTP server assembly for the timetable service.
//!
//! Holds the runtime configuration and mounts the JSON API under `/api` next
//! to a `/health` check.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, routing::get};
use serde::Deserialize;
use timetable_core::{
  placement::{DEFAULT_PERIODS, PlacementOptions},
  store::TimetableStore,
};
use tower_http::trace::TraceLayer;

/// Prefix of the environment variables that override the config file, e.g.
/// `TIMETABLE_PORT=9000`.
pub const ENV_PREFIX: &str = "TIMETABLE";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  #[serde(default = "default_store_path")]
  pub store_path:      PathBuf,
  /// Periods per week for assignments that do not say.
  #[serde(default = "default_periods")]
  pub default_periods: u32,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("timetable.db") }

fn default_periods() -> u32 { DEFAULT_PERIODS }

impl ServerConfig {
  /// Layer `TIMETABLE_*` environment variables over the file at `path`. A
  /// missing file is not an error.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX))
      .build()?
      .try_deserialize()
  }

  pub fn placement(&self) -> PlacementOptions {
    PlacementOptions { default_periods: self.default_periods }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: `/health` plus the API nested under `/api`, with
/// request tracing.
pub fn app<S>(store: Arc<S>, placement: PlacementOptions) -> Router
where
  S: TimetableStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", timetable_api::api_router(store, placement))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }
