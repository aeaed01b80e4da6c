//! Core domain types and utilities for the dashwire platform.
//!
//! This crate provides the foundational identifier types and error handling
//! shared by the dashboard widget and webhook-relay crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{DashboardId, ParseIdError, WidgetId};
