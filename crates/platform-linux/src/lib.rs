//! obscap Linux Platform Integration
//!
//! Platform-specific implementations for Linux:
//! - **Display Detection:** display server detection and X11 monitor enumeration
//! - **Capabilities:** checks for the external tools capture depends on

pub mod capabilities;
pub mod display;

pub use display::*;
