//! Core types, scheduling algorithms and the store trait for the timetable
//! service.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! grid builder, assignment index, placement engine and conflict detector are
//! pure functions over the types defined here; [`service`] wires them to any
//! [`store::TimetableStore`] backend.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod assignment;
pub mod config;
pub mod conflict;
pub mod error;
pub mod grid;
pub mod placement;
pub mod service;
pub mod slot;
pub mod snapshot;
pub mod store;
pub mod timetable;
pub mod version;

pub use error::{ConfigError, Error, Result};
