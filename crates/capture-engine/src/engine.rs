//! Capability interface of the external capture engine.
//!
//! The engine does the real capture and encoding work. The session manager
//! only sequences calls into it through [`CaptureEngine`].

use std::sync::atomic::{AtomicU64, Ordering};

use obscap_common::error::EngineResult;
use obscap_platform_core::{DisplayDescriptor, PermissionStatus};

use crate::config::RecordingConfig;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Copyable identifier of an [`EngineHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "engine-{}", self.0)
    }
}

/// Ownership token for a started engine.
///
/// Created by [`CaptureEngine::start`] and consumed by
/// [`CaptureEngine::stop`]. Deliberately not `Clone`.
#[derive(Debug, PartialEq, Eq)]
pub struct EngineHandle {
    id: HandleId,
    label: String,
}

impl EngineHandle {
    /// Mint a fresh handle with a process-unique id.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)),
            label: label.into(),
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Engine-provided description (e.g. backend and version).
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Optional screen-recording permission capability.
///
/// Engines on platforms without a permission model expose none, and the
/// session reports [`PermissionStatus::NotApplicable`].
pub trait PermissionProbe: Send + Sync {
    /// Current status, without prompting.
    fn query(&self) -> PermissionStatus;

    /// Prompt for the permission if the platform allows it.
    fn request(&self) -> PermissionStatus;
}

/// Abstract interface to the external capture engine.
///
/// Methods take `&self` so enumeration can run alongside an in-flight
/// transition; implementations use interior mutability.
pub trait CaptureEngine: Send + Sync {
    /// Engine version string. Pure query.
    fn version(&self) -> String;

    /// Permission capability, if the platform has one.
    fn permissions(&self) -> Option<&dyn PermissionProbe> {
        None
    }

    /// Bring the engine up.
    fn start(&self) -> EngineResult<EngineHandle>;

    /// Enumerate capturable displays, in engine priority order.
    fn enumerate_displays(&self, handle: &EngineHandle) -> EngineResult<Vec<DisplayDescriptor>>;

    /// Begin writing a recording described by `config`.
    fn begin_capture(&self, handle: &EngineHandle, config: &RecordingConfig) -> EngineResult<()>;

    /// End the current recording and finalize its output file.
    fn end_capture(&self, handle: &EngineHandle) -> EngineResult<()>;

    /// Tear the engine down, consuming its handle.
    fn stop(&self, handle: EngineHandle) -> EngineResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_get_distinct_ids() {
        let a = EngineHandle::new("a");
        let b = EngineHandle::new("b");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.label(), "a");
        assert!(a.id().to_string().starts_with("engine-"));
    }
}
