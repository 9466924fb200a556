//! obscap Capture Engine
//!
//! Sequences calls into an external screen-capture engine. The engine does
//! the capture, encoding and muxing; this crate owns the session lifecycle
//! around it and rejects calls made in the wrong state.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                SessionManager                 │
//! │  state machine · transition lock · handle     │
//! └───────────────────────┬───────────────────────┘
//!                         │ CaptureEngine
//!          ┌──────────────┴──────────────┐
//!          ▼                             ▼
//!   ┌──────────────┐              ┌──────────────┐
//!   │ FfmpegEngine │              │  StubEngine  │
//!   │ (ffmpeg CLI) │              │ (in-memory)  │
//!   └──────────────┘              └──────────────┘
//! ```

pub mod backend;
pub mod config;
pub mod engine;
pub mod session;

pub use backend::{get_backend, EngineKind, FfmpegEngine, StubEngine};
pub use config::{RecordingConfig, RecordingRequest};
pub use engine::{CaptureEngine, EngineHandle, HandleId, PermissionProbe};
pub use session::*;
