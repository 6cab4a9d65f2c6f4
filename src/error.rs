//! Error types for API-boundary contract violations.
//!
//! Protocol-level problems (malformed sequences, out-of-range parameters,
//! oversized strings) never surface here; those degrade in place. The only
//! fallible operations are the ones a host can call with arguments that
//! violate the crate's preconditions.

use thiserror::Error;

/// Errors returned by `vtcore` public APIs.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A grid was created or resized with a zero dimension.
    #[error("grid dimensions must be non-zero (got {cols}x{rows})")]
    InvalidDimensions { cols: u16, rows: u16 },
}
