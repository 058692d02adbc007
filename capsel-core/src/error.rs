//! Error types for Capsel operations.
//!
//! Normal cache and resolver operation has no failure paths: unregistered
//! features read as false and malformed expressions reduce to no selection.
//! Probe functions are trusted, environment-authored code; a panicking probe
//! propagates to the caller of `query` rather than being caught here. The
//! only fallible surface is the resource-loading boundary.

use thiserror::Error;

/// Errors surfaced at the resource-loading boundary.
#[derive(Debug, Error)]
pub enum CapselError {
    /// The loader could not produce the resource a selection named.
    #[error("failed to load resource '{id}': {reason}")]
    LoadFailed { id: String, reason: String },
}

/// Result type alias for Capsel operations.
pub type Result<T> = std::result::Result<T, CapselError>;
