//! # Dropship server
//! This crate hosts the HTTP server for the dropship engine. It is responsible for:
//! * Identifying callers from the gateway headers and enforcing role-based access to each route.
//! * Translating requests into engine API calls, and engine errors into HTTP status codes.
//! * Running the expiry worker, which cancels unpaid on-hold orders and completes unacknowledged shipments.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! `/health` is open. Every other route lives under `/api` and requires an authenticated caller. See
//! [routes](routes/index.html) for the full list.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
