//! Error handling foundation for the dashwire platform.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own domain-specific error types in their own
//! error modules; layers that compose them (the server) use rootcause's
//! `.context()` to add context as errors propagate up the stack.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
///
/// Domain crates return their own error enums directly; this alias is for
/// composition layers that wrap them with additional context.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
