//! # Fleetbook API Library
//!
//! This library provides the core functionality for the Fleetbook API
//! service: the multi-tenant booking engine (overlap detection, bike status
//! reconciliation, availability projection, lifecycle transitions, return
//! settlement) and the HTTP surface around it.

pub mod auth;
pub mod availability;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod overlap;
pub mod repositories;
pub mod server;
pub mod settlement;
pub mod status_sync;
pub mod sweeper;
pub mod telemetry;
pub use migration;
