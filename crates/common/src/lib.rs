//! obscap Common Utilities
//!
//! Shared infrastructure for all obscap crates:
//! - Error taxonomy (state, config, engine) and result aliases
//! - Recording clock used to time sessions
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
