//! # HTTP Server
//!
//! Thin request/response mapping layer: parses JSON bodies, ensures a live
//! pool, dispatches to the executor / bulk loader / transaction
//! coordinator, and serializes whatever result or error comes back.

pub mod api_routes;
pub mod config;
pub mod errors;
pub mod health_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use errors::ApiError;
pub use server::{AppState, HttpServer};
