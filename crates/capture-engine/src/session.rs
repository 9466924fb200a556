//! Capture session lifecycle management.
//!
//! ```text
//! Uninitialized ──initialize──▶ Initialized ⇄ Recording
//!       │                           │            │
//!       └────────── shutdown ───────┴────────────┴──▶ ShuttingDown ──▶ Shutdown
//! ```
//!
//! Transitions are serialized by a dedicated mutex. State and the engine
//! handle sit behind a read/write lock so display enumeration can proceed
//! while a transition is waiting on the engine.

use std::path::PathBuf;

use obscap_common::clock::RecordingClock;
use obscap_common::config::RecordingDefaults;
use obscap_common::error::{EngineResult, ObscapResult, StateError};
use obscap_platform_core::{order_primary_first, DisplayDescriptor, DisplayId, PermissionStatus};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::config::{select_display, RecordingConfig, RecordingRequest};
use crate::engine::{CaptureEngine, EngineHandle, HandleId};

/// State of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Engine not started yet.
    Uninitialized,
    /// Engine running, not recording.
    Initialized,
    /// Recording in progress.
    Recording,
    /// Teardown in progress.
    ShuttingDown,
    /// Engine released. Terminal.
    Shutdown,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Recording => "recording",
            Self::ShuttingDown => "shutting down",
            Self::Shutdown => "shutdown",
        };
        f.write_str(label)
    }
}

/// Outcome of a finished recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingSummary {
    pub output_path: PathBuf,
    pub display_id: DisplayId,
    pub duration_secs: f64,
    /// Wall-clock start, RFC 3339.
    pub started_at: String,
}

struct ActiveRecording {
    config: RecordingConfig,
    clock: RecordingClock,
}

struct SessionInner {
    state: SessionState,
    handle: Option<EngineHandle>,
    active: Option<ActiveRecording>,
}

/// Owns the lifecycle of one capture engine connection.
///
/// Every operation takes `&self`; share a manager across threads with
/// `Arc<SessionManager>`.
pub struct SessionManager {
    engine: Box<dyn CaptureEngine>,
    defaults: RecordingDefaults,
    transition: Mutex<()>,
    inner: RwLock<SessionInner>,
}

impl SessionManager {
    /// Create a manager over `engine` with default recording settings.
    pub fn new(engine: Box<dyn CaptureEngine>) -> Self {
        Self::with_defaults(engine, RecordingDefaults::default())
    }

    /// Create a manager that fills missing request fields from `defaults`.
    pub fn with_defaults(engine: Box<dyn CaptureEngine>, defaults: RecordingDefaults) -> Self {
        Self {
            engine,
            defaults,
            transition: Mutex::new(()),
            inner: RwLock::new(SessionInner {
                state: SessionState::Uninitialized,
                handle: None,
                active: None,
            }),
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    /// Id of the live engine handle, if any.
    pub fn handle_id(&self) -> Option<HandleId> {
        self.inner.read().handle.as_ref().map(EngineHandle::id)
    }

    /// Output path of the recording in progress.
    pub fn active_output_path(&self) -> Option<PathBuf> {
        self.inner
            .read()
            .active
            .as_ref()
            .map(|a| a.config.output_path.clone())
    }

    /// Resolved configuration of the recording in progress.
    pub fn active_config(&self) -> Option<RecordingConfig> {
        self.inner.read().active.as_ref().map(|a| a.config.clone())
    }

    /// Engine version. Valid in any state.
    pub fn query_version(&self) -> String {
        self.engine.version()
    }

    /// Screen-recording permission. Valid in any state.
    pub fn check_capture_permission(&self) -> PermissionStatus {
        self.engine
            .permissions()
            .map_or(PermissionStatus::NotApplicable, |p| p.query())
    }

    /// Prompt for screen-recording permission. Valid in any state.
    pub fn request_capture_permission(&self) -> PermissionStatus {
        let status = self
            .engine
            .permissions()
            .map_or(PermissionStatus::NotApplicable, |p| p.request());
        tracing::info!(%status, "Capture permission requested");
        status
    }

    /// Start the engine.
    pub fn initialize(&self) -> ObscapResult<HandleId> {
        let _transition = self.transition.lock();

        match self.state() {
            SessionState::Uninitialized => {}
            SessionState::Initialized | SessionState::Recording => {
                return Err(StateError::AlreadyInitialized.into())
            }
            SessionState::ShuttingDown | SessionState::Shutdown => {
                return Err(StateError::AlreadyShutdown.into())
            }
        }

        tracing::info!("Starting capture engine");
        let handle = self.engine.start().map_err(|e| {
            tracing::error!(error = %e, "Capture engine failed to start");
            e
        })?;

        let id = handle.id();
        tracing::info!(handle = %id, label = handle.label(), "Capture engine started");

        let mut inner = self.inner.write();
        inner.handle = Some(handle);
        inner.state = SessionState::Initialized;
        Ok(id)
    }

    /// Enumerate displays, primary first. Never cached.
    pub fn list_displays(&self) -> ObscapResult<Vec<DisplayDescriptor>> {
        let inner = self.inner.read();
        let handle = live_handle(&inner)?;
        Ok(self.enumerate(handle)?)
    }

    /// Begin recording to `request.output_path`.
    pub fn start_recording(&self, request: RecordingRequest) -> ObscapResult<()> {
        let _transition = self.transition.lock();

        let inner = self.inner.read();
        match inner.state {
            SessionState::Initialized => {}
            SessionState::Uninitialized => return Err(StateError::NotInitialized.into()),
            SessionState::Recording => return Err(StateError::AlreadyRecording.into()),
            SessionState::ShuttingDown | SessionState::Shutdown => {
                return Err(StateError::AlreadyShutdown.into())
            }
        }
        let handle = live_handle(&inner)?;

        request.validate()?;

        let displays = self.enumerate(handle)?;
        let display = select_display(
            request.display_id.as_ref(),
            self.defaults.display_policy,
            &displays,
        )?;
        let config = RecordingConfig::resolve(&request, &self.defaults, display)?;

        let permission = self.check_capture_permission();
        if !permission.allows_capture() {
            tracing::warn!(%permission, "Screen recording permission not granted; capture may be blank");
        }

        tracing::info!(
            output = %config.output_path.display(),
            display = %config.display.id,
            width = config.width,
            height = config.height,
            fps = config.fps,
            "Starting recording"
        );
        self.engine.begin_capture(handle, &config).map_err(|e| {
            tracing::error!(error = %e, "Engine refused to begin capture");
            e
        })?;
        drop(inner);

        let mut inner = self.inner.write();
        inner.active = Some(ActiveRecording {
            config,
            clock: RecordingClock::start(),
        });
        inner.state = SessionState::Recording;

        tracing::info!("Recording started");
        Ok(())
    }

    /// Stop the recording in progress and finalize its output.
    ///
    /// The session returns to `Initialized` even when finalization fails;
    /// the engine's capture is over either way.
    pub fn stop_recording(&self) -> ObscapResult<RecordingSummary> {
        let _transition = self.transition.lock();

        let inner = self.inner.read();
        match inner.state {
            SessionState::Recording => {}
            SessionState::ShuttingDown | SessionState::Shutdown => {
                return Err(StateError::AlreadyShutdown.into())
            }
            SessionState::Uninitialized | SessionState::Initialized => {
                return Err(StateError::NotRecording.into())
            }
        }
        let handle = live_handle(&inner)?;

        tracing::info!("Stopping recording");
        let finalized = self.engine.end_capture(handle);
        drop(inner);

        let active = {
            let mut inner = self.inner.write();
            inner.state = SessionState::Initialized;
            inner.active.take()
        };

        if let Err(e) = finalized {
            tracing::error!(error = %e, "Recording could not be finalized");
            return Err(e.into());
        }

        let active = active.ok_or(StateError::NotRecording)?;
        let summary = RecordingSummary {
            output_path: active.config.output_path,
            display_id: active.config.display.id,
            duration_secs: active.clock.elapsed_secs(),
            started_at: active.clock.epoch_wall().to_string(),
        };

        tracing::info!(
            output = %summary.output_path.display(),
            duration_secs = summary.duration_secs,
            "Recording stopped"
        );
        Ok(summary)
    }

    /// Release the engine. Any recording in progress is stopped first on a
    /// best-effort basis.
    pub fn shutdown(&self) -> ObscapResult<()> {
        let _transition = self.transition.lock();

        let (handle, was_recording) = {
            let mut inner = self.inner.write();
            match inner.state {
                SessionState::ShuttingDown | SessionState::Shutdown => {
                    return Err(StateError::AlreadyShutdown.into())
                }
                SessionState::Uninitialized => {
                    inner.state = SessionState::Shutdown;
                    tracing::info!("Session shut down before the engine was started");
                    return Ok(());
                }
                SessionState::Initialized | SessionState::Recording => {}
            }
            let was_recording = inner.state == SessionState::Recording;
            inner.state = SessionState::ShuttingDown;
            inner.active = None;
            (inner.handle.take(), was_recording)
        };

        let result = match handle {
            Some(handle) => self.release(handle, was_recording),
            None => Ok(()),
        };

        self.inner.write().state = SessionState::Shutdown;
        tracing::info!("Capture engine shut down");
        Ok(result?)
    }

    fn release(&self, handle: EngineHandle, was_recording: bool) -> EngineResult<()> {
        if was_recording {
            tracing::info!("Stopping in-progress recording before shutdown");
            if let Err(e) = self.engine.end_capture(&handle) {
                tracing::warn!(error = %e, "Failed to stop recording during shutdown");
            }
        }
        self.engine.stop(handle).map_err(|e| {
            tracing::error!(error = %e, "Capture engine did not stop cleanly");
            e
        })
    }

    fn enumerate(&self, handle: &EngineHandle) -> EngineResult<Vec<DisplayDescriptor>> {
        let mut displays = self.engine.enumerate_displays(handle)?;
        order_primary_first(&mut displays);
        tracing::debug!(count = displays.len(), "Enumerated displays");
        Ok(displays)
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if matches!(
            self.state(),
            SessionState::Initialized | SessionState::Recording
        ) {
            tracing::warn!("Session dropped without shutdown; releasing engine");
            if let Err(e) = self.shutdown() {
                tracing::warn!(error = %e, "Implicit shutdown failed");
            }
        }
    }
}

/// The engine handle, provided the session is initialized or recording.
fn live_handle(inner: &SessionInner) -> Result<&EngineHandle, StateError> {
    match inner.state {
        SessionState::Initialized | SessionState::Recording => {
            inner.handle.as_ref().ok_or(StateError::NotInitialized)
        }
        SessionState::Uninitialized => Err(StateError::NotInitialized),
        SessionState::ShuttingDown | SessionState::Shutdown => Err(StateError::AlreadyShutdown),
    }
}
