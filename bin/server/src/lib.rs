//! dashwire API server.
//!
//! This crate wires the Postgres-backed widget store and the reqwest
//! webhook client into the relay, and serves the refresh/submit wire
//! contract over axum.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
