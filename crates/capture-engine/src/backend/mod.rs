//! Engine backends.
//!
//! The capture engine itself is external; backends adapt it to
//! [`CaptureEngine`].

use std::str::FromStr;

use crate::engine::CaptureEngine;

pub mod ffmpeg;
pub mod permission;
pub mod stub;

pub use ffmpeg::FfmpegEngine;
pub use stub::StubEngine;

/// Which backend to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// External `ffmpeg` process.
    #[default]
    Ffmpeg,
    /// In-memory engine for dry runs.
    Stub,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ffmpeg" => Ok(Self::Ffmpeg),
            "stub" => Ok(Self::Stub),
            other => Err(format!("unknown engine '{other}' (expected ffmpeg or stub)")),
        }
    }
}

/// Get the backend for `kind`.
pub fn get_backend(kind: EngineKind) -> Box<dyn CaptureEngine> {
    match kind {
        EngineKind::Ffmpeg => Box::new(FfmpegEngine::new()),
        EngineKind::Stub => Box::new(StubEngine::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_kind_parses_case_insensitively() {
        assert_eq!("FFmpeg".parse::<EngineKind>(), Ok(EngineKind::Ffmpeg));
        assert_eq!("stub".parse::<EngineKind>(), Ok(EngineKind::Stub));
        assert!("obs".parse::<EngineKind>().is_err());
    }

    #[test]
    fn stub_backend_reports_stub_version() {
        let engine = get_backend(EngineKind::Stub);
        assert_eq!(engine.version(), stub::STUB_VERSION);
        assert!(engine.permissions().is_none());
    }
}
