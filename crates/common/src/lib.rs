//! Peekaboo Common Utilities
//!
//! Shared infrastructure for all Peekaboo crates:
//! - Error taxonomy and result aliases
//! - Monotonic session clock and rate limiting
//! - Tracing/logging initialization
//! - Configuration loading and validation

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
