//! Subcommand implementations.
//!
//! Each command builds its own session; sequencing rules live in the
//! session manager, not here.

use obscap_capture_engine::{get_backend, EngineKind, SessionManager};
use obscap_common::config::AppConfig;

pub mod check;
pub mod displays;
pub mod record;
pub mod version;

/// Create a session over the selected backend.
pub fn open_session(engine: EngineKind, config: &AppConfig) -> SessionManager {
    SessionManager::with_defaults(get_backend(engine), config.recording.clone())
}
