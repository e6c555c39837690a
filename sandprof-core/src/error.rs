//! Profiler error types

use thiserror::Error;

/// Profiler error type
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// `start` was called while a run is in progress
    #[error("Profiling is already active")]
    AlreadyActive,

    /// `stop` was called without an active run
    #[error("Profiling is not active")]
    NotActive,

    /// The session already produced its report and cannot be restarted
    #[error("Profiling session has already finished; create a new session")]
    SessionFinished,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// TOML parse error
    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ProfilerError>;

impl ProfilerError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// State errors are caller bugs rather than environmental failures
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyActive | Self::NotActive | Self::SessionFinished
        )
    }
}
