//! Error types shared across obscap crates.
//!
//! Errors fall into three families:
//! - [`StateError`]: an operation was called in the wrong session state.
//! - [`ConfigError`]: a recording request failed local validation.
//! - [`EngineError`]: the external capture engine reported a failure.
//!
//! State and config errors are produced locally and never reach the engine.
//! Engine errors are passed through unchanged and never retried.

/// Wrong-state call on a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Capture engine is not initialized")]
    NotInitialized,

    #[error("Capture engine is already initialized")]
    AlreadyInitialized,

    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("No recording is in progress")]
    NotRecording,

    #[error("Capture session has been shut down")]
    AlreadyShutdown,
}

/// A recording request that cannot be used as given.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid recording config ({field}): {reason}")]
    InvalidConfig { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            Self::InvalidConfig { field, .. } => field,
        }
    }
}

/// Opaque failure surfaced from the capture engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Engine startup failed: {message}")]
    Startup { message: String },

    #[error("Display enumeration failed: {message}")]
    Enumeration { message: String },

    #[error("Failed to begin capture: {message}")]
    Capture { message: String },

    #[error("Failed to finalize recording: {message}")]
    Finalize { message: String },

    #[error("Engine stop failed: {message}")]
    Stop { message: String },
}

impl EngineError {
    pub fn startup(msg: impl Into<String>) -> Self {
        Self::Startup {
            message: msg.into(),
        }
    }

    pub fn enumeration(msg: impl Into<String>) -> Self {
        Self::Enumeration {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn finalize(msg: impl Into<String>) -> Self {
        Self::Finalize {
            message: msg.into(),
        }
    }

    pub fn stop(msg: impl Into<String>) -> Self {
        Self::Stop {
            message: msg.into(),
        }
    }
}

/// Top-level error type for obscap operations.
#[derive(Debug, thiserror::Error)]
pub enum ObscapError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ObscapError.
pub type ObscapResult<T> = Result<T, ObscapError>;

/// Result type alias for calls into the capture engine.
pub type EngineResult<T> = Result<T, EngineError>;

impl ObscapError {
    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config(ConfigError::invalid(field, reason))
    }

    /// The state error carried by this error, if any.
    pub fn as_state(&self) -> Option<StateError> {
        match self {
            Self::State(e) => Some(*e),
            _ => None,
        }
    }

    /// The engine error carried by this error, if any.
    pub fn as_engine(&self) -> Option<&EngineError> {
        match self {
            Self::Engine(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this is a config validation failure.
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, Self::Config(ConfigError::InvalidConfig { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_pass_through_verbatim() {
        let err: ObscapError = EngineError::startup("obs_startup returned false").into();
        assert_eq!(
            err.to_string(),
            "Engine startup failed: obs_startup returned false"
        );
        assert_eq!(
            err.as_engine(),
            Some(&EngineError::startup("obs_startup returned false"))
        );
        assert!(err.as_state().is_none());
    }

    #[test]
    fn state_error_is_recoverable_from_top_level() {
        let err: ObscapError = StateError::AlreadyShutdown.into();
        assert_eq!(err.as_state(), Some(StateError::AlreadyShutdown));
        assert!(!err.is_invalid_config());
    }

    #[test]
    fn invalid_config_names_the_field() {
        let err = ObscapError::invalid_config("fps", "must be positive");
        assert!(err.is_invalid_config());
        assert_eq!(
            err.to_string(),
            "Invalid recording config (fps): must be positive"
        );
        match err {
            ObscapError::Config(cfg) => assert_eq!(cfg.field(), "fps"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
