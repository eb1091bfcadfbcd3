//! JSON REST API for the timetable service.
//!
//! Exposes an axum [`Router`] backed by any
//! [`timetable_core::store::TimetableStore`]. Auth, TLS and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", timetable_api::api_router(store.clone(), PlacementOptions::default()))
//! ```

pub mod configs;
pub mod entries;
pub mod error;
pub mod timetables;
pub mod versions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use timetable_core::{placement::PlacementOptions, store::TimetableStore};

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:     Arc<S>,
  pub placement: PlacementOptions,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), placement: self.placement }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, placement: PlacementOptions) -> Router<()>
where
  S: TimetableStore + 'static,
{
  Router::new()
    // Timetables
    .route("/timetables", get(timetables::list::<S>).post(timetables::create::<S>))
    .route(
      "/timetables/{id}",
      get(timetables::get_one::<S>)
        .put(timetables::update::<S>)
        .delete(timetables::delete::<S>),
    )
    .route(
      "/timetables/{id}/entries",
      get(entries::list::<S>).post(entries::create::<S>),
    )
    .route("/timetables/{id}/generate", post(timetables::generate::<S>))
    .route("/timetables/{id}/conflicts", get(timetables::conflicts::<S>))
    .route("/timetables/{id}/grid", get(timetables::grid::<S>))
    .route(
      "/timetables/{id}/versions",
      get(versions::list::<S>).post(versions::create::<S>),
    )
    // Entries
    .route(
      "/entries/{id}",
      get(entries::get_one::<S>)
        .put(entries::update::<S>)
        .delete(entries::delete::<S>),
    )
    .route("/entries/{id}/lock", put(entries::lock::<S>))
    // Versions
    .route("/versions/{id}/changes", get(versions::changes::<S>))
    // Configs
    .route("/configs", get(configs::list::<S>).post(configs::create::<S>))
    .route("/configs/active", get(configs::active::<S>))
    .route(
      "/configs/{id}",
      get(configs::get_one::<S>)
        .put(configs::update::<S>)
        .delete(configs::delete::<S>),
    )
    .route("/configs/{id}/grid", get(configs::grid::<S>))
    .with_state(ApiState { store, placement })
}

#[cfg(test)]
mod tests;
