//! Deterministic in-memory engine.
//!
//! Used for dry runs (`obscap --engine stub`) and tests. Clones share state,
//! so a test can hand one clone to a session and inspect the other.

use std::path::PathBuf;
use std::sync::Arc;

use obscap_common::error::{EngineError, EngineResult};
use obscap_platform_core::{DisplayDescriptor, DisplayId, PermissionStatus};
use parking_lot::Mutex;

use crate::config::RecordingConfig;
use crate::engine::{CaptureEngine, EngineHandle, HandleId, PermissionProbe};

pub const STUB_VERSION: &str = "stub-1.0.0";

/// An engine call, as recorded by [`StubEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Start,
    EnumerateDisplays,
    BeginCapture(PathBuf),
    EndCapture,
    Stop,
}

/// Engine operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StubFailure {
    Start,
    EnumerateDisplays,
    BeginCapture,
    EndCapture,
    Stop,
}

#[derive(Debug, Default)]
struct StubState {
    displays: Vec<DisplayDescriptor>,
    failures: Vec<(StubFailure, String)>,
    live_handle: Option<HandleId>,
    capturing: Option<RecordingConfig>,
    calls: Vec<EngineCall>,
}

impl StubState {
    fn failure(&self, op: StubFailure) -> Option<String> {
        self.failures
            .iter()
            .find(|(f, _)| *f == op)
            .map(|(_, msg)| msg.clone())
    }

    fn check_handle(&self, handle: &EngineHandle) -> Result<(), String> {
        match self.live_handle {
            Some(id) if id == handle.id() => Ok(()),
            Some(id) => Err(format!("stale handle {} (live: {id})", handle.id())),
            None => Err(format!("engine not running (got {})", handle.id())),
        }
    }
}

/// Permission capability whose status is set by the test.
#[derive(Debug, Clone)]
pub struct StubPermission {
    status: Arc<Mutex<PermissionStatus>>,
}

impl PermissionProbe for StubPermission {
    fn query(&self) -> PermissionStatus {
        *self.status.lock()
    }

    /// A pending prompt is answered with "granted".
    fn request(&self) -> PermissionStatus {
        let mut status = self.status.lock();
        if *status == PermissionStatus::NotDetermined {
            *status = PermissionStatus::Granted;
        }
        *status
    }
}

/// In-memory [`CaptureEngine`].
#[derive(Debug, Clone)]
pub struct StubEngine {
    state: Arc<Mutex<StubState>>,
    permission: Option<StubPermission>,
}

impl StubEngine {
    /// One primary 1920x1080 display with id `0`, no permission model.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StubState {
                displays: vec![stub_display(0, true)],
                ..StubState::default()
            })),
            permission: None,
        }
    }

    /// Replace the reported display list.
    pub fn with_displays(self, displays: Vec<DisplayDescriptor>) -> Self {
        self.state.lock().displays = displays;
        self
    }

    /// Expose a permission capability with the given initial status.
    pub fn with_permission(mut self, status: PermissionStatus) -> Self {
        self.permission = Some(StubPermission {
            status: Arc::new(Mutex::new(status)),
        });
        self
    }

    /// Make `op` fail with `message` until [`StubEngine::clear_failures`].
    pub fn fail_on(self, op: StubFailure, message: impl Into<String>) -> Self {
        self.state.lock().failures.push((op, message.into()));
        self
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Replace the display list on a shared engine (simulates hot-plug).
    pub fn set_displays(&self, displays: Vec<DisplayDescriptor>) {
        self.state.lock().displays = displays;
    }

    /// Calls received so far, oldest first.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().calls.clone()
    }

    /// Config of the capture in progress.
    pub fn capturing(&self) -> Option<RecordingConfig> {
        self.state.lock().capturing.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().live_handle.is_some()
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// A 1920x1080 display with an index id.
pub fn stub_display(index: u32, primary: bool) -> DisplayDescriptor {
    DisplayDescriptor {
        id: DisplayId::Index(index),
        label: format!("Stub display {index}"),
        width: 1920,
        height: 1080,
        x: (index as i32) * 1920,
        y: 0,
        primary,
    }
}

impl CaptureEngine for StubEngine {
    fn version(&self) -> String {
        STUB_VERSION.to_string()
    }

    fn permissions(&self) -> Option<&dyn PermissionProbe> {
        self.permission.as_ref().map(|p| p as &dyn PermissionProbe)
    }

    fn start(&self) -> EngineResult<EngineHandle> {
        let mut state = self.state.lock();
        state.calls.push(EngineCall::Start);
        if let Some(msg) = state.failure(StubFailure::Start) {
            return Err(EngineError::startup(msg));
        }
        if state.live_handle.is_some() {
            return Err(EngineError::startup("engine already running"));
        }
        let handle = EngineHandle::new(format!("stub {STUB_VERSION}"));
        state.live_handle = Some(handle.id());
        Ok(handle)
    }

    fn enumerate_displays(&self, handle: &EngineHandle) -> EngineResult<Vec<DisplayDescriptor>> {
        let mut state = self.state.lock();
        state.calls.push(EngineCall::EnumerateDisplays);
        state.check_handle(handle).map_err(EngineError::enumeration)?;
        if let Some(msg) = state.failure(StubFailure::EnumerateDisplays) {
            return Err(EngineError::enumeration(msg));
        }
        Ok(state.displays.clone())
    }

    fn begin_capture(&self, handle: &EngineHandle, config: &RecordingConfig) -> EngineResult<()> {
        let mut state = self.state.lock();
        state
            .calls
            .push(EngineCall::BeginCapture(config.output_path.clone()));
        state.check_handle(handle).map_err(EngineError::capture)?;
        if let Some(msg) = state.failure(StubFailure::BeginCapture) {
            return Err(EngineError::capture(msg));
        }
        if state.capturing.is_some() {
            return Err(EngineError::capture("capture already running"));
        }
        state.capturing = Some(config.clone());
        Ok(())
    }

    fn end_capture(&self, handle: &EngineHandle) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.calls.push(EngineCall::EndCapture);
        state.check_handle(handle).map_err(EngineError::finalize)?;
        // The capture ends even if finalizing the file fails.
        let was_capturing = state.capturing.take().is_some();
        if let Some(msg) = state.failure(StubFailure::EndCapture) {
            return Err(EngineError::finalize(msg));
        }
        if !was_capturing {
            return Err(EngineError::finalize("no capture in progress"));
        }
        Ok(())
    }

    fn stop(&self, handle: EngineHandle) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.calls.push(EngineCall::Stop);
        state.check_handle(&handle).map_err(EngineError::stop)?;
        state.live_handle = None;
        state.capturing = None;
        if let Some(msg) = state.failure(StubFailure::Stop) {
            return Err(EngineError::stop(msg));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_start_is_refused_while_running() {
        let engine = StubEngine::new();
        let handle = engine.start().unwrap();
        assert!(matches!(engine.start(), Err(EngineError::Startup { .. })));

        engine.stop(handle).unwrap();
        assert!(!engine.is_running());
        assert!(engine.start().is_ok());
    }

    #[test]
    fn foreign_handles_are_rejected() {
        let engine = StubEngine::new();
        let _live = engine.start().unwrap();
        let foreign = EngineHandle::new("foreign");
        assert!(matches!(
            engine.enumerate_displays(&foreign),
            Err(EngineError::Enumeration { .. })
        ));
    }

    #[test]
    fn permission_request_resolves_pending_prompt() {
        let engine = StubEngine::new().with_permission(PermissionStatus::NotDetermined);
        let probe = engine.permissions().unwrap();
        assert_eq!(probe.query(), PermissionStatus::NotDetermined);
        assert_eq!(probe.request(), PermissionStatus::Granted);
        assert_eq!(probe.query(), PermissionStatus::Granted);

        let denied = StubEngine::new().with_permission(PermissionStatus::Denied);
        assert_eq!(
            denied.permissions().unwrap().request(),
            PermissionStatus::Denied
        );
    }

    #[test]
    fn clones_share_call_log() {
        let engine = StubEngine::new();
        let observer = engine.clone();
        let handle = engine.start().unwrap();
        engine.enumerate_displays(&handle).unwrap();
        assert_eq!(
            observer.calls(),
            vec![EngineCall::Start, EngineCall::EnumerateDisplays]
        );
    }
}
