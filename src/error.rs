//! Error types for telemetry polling and screen recording.
//!
//! All errors implement `std::error::Error` and carry enough context to tell
//! the caller whether a retry makes sense.
//!
//! ## Error Categories
//!
//! - **Connection Errors**: the simulator is not running or its shared memory
//!   could not be opened. These are retryable.
//! - **Telemetry Errors**: a channel is missing, has an unexpected type, or
//!   points outside the frozen buffer. These indicate malformed telemetry.
//! - **Capture / Encoder Errors**: grabbing a display frame or feeding the
//!   video encoder failed.
//! - **Recorder Errors**: lifecycle misuse of the screen recorder or a worker
//!   thread that panicked.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use raceclips::ClipsError;
//!
//! let error = ClipsError::connection_failed("iRacing not running");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

#[cfg(windows)]
use windows_core as core;

/// Result type alias for raceclips operations.
pub type Result<T, E = ClipsError> = std::result::Result<T, E>;

/// Main error type for raceclips.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClipsError {
    #[error("Failed to connect to iRacing: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("SDK version mismatch: expected {expected}, found {found}")]
    Version { expected: u32, found: u32 },

    #[error("Telemetry buffer access out of bounds at offset {offset:#x}")]
    Memory { offset: usize },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Field '{field}' not found in telemetry data")]
    FieldNotFound { field: String },

    #[error("Type conversion error: {details}")]
    TypeConversion { details: String },

    #[error("{feature} is only available on {required_platform}")]
    UnsupportedPlatform { feature: String, required_platform: String },

    #[error("Screen capture failed: {reason}")]
    Capture { reason: String },

    #[error("Video encoder '{encoder}' is not available")]
    EncoderUnavailable {
        encoder: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Video encoding failed for {path}: {reason}")]
    Encoder {
        path: PathBuf,
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error("Windows API error: {operation}")]
    #[cfg(windows)]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },
}

/// Lifecycle errors raised by the screen recorder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("Recording is already in progress")]
    AlreadyRecording,

    #[error("No recording is in progress")]
    NotRecording,

    #[error("Failed to spawn recording worker: {reason}")]
    Spawn { reason: String },

    #[error("Recording worker panicked: {message}")]
    WorkerPanicked { message: String },
}

impl ClipsError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClipsError::Connection { .. } => true,
            ClipsError::Capture { .. } => true,
            ClipsError::Version { .. } => false,
            ClipsError::Memory { .. } => false,
            ClipsError::Parse { .. } => false,
            ClipsError::FieldNotFound { .. } => false,
            ClipsError::TypeConversion { .. } => false,
            ClipsError::UnsupportedPlatform { .. } => false,
            ClipsError::EncoderUnavailable { .. } => false,
            ClipsError::Encoder { .. } => false,
            ClipsError::Recorder(RecorderError::AlreadyRecording) => true,
            ClipsError::Recorder(RecorderError::NotRecording) => true,
            ClipsError::Recorder(_) => false,
            #[cfg(windows)]
            ClipsError::WindowsApi { .. } => true,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ClipsError::Connection { .. } => vec![
                "Ensure iRacing is running and a session is loaded",
                "Check Windows permissions for shared memory access",
                "Try restarting iRacing",
            ],
            ClipsError::Version { .. } => vec![
                "Update iRacing to the latest version",
                "Update raceclips to a compatible version",
            ],
            ClipsError::Memory { .. } | ClipsError::Parse { .. } => vec![
                "Verify the telemetry source is publishing complete frames",
                "Restart the application",
            ],
            ClipsError::FieldNotFound { .. } | ClipsError::TypeConversion { .. } => vec![
                "Check the telemetry channel name and type",
                "Verify the channel exists in the current iRacing version",
            ],
            ClipsError::UnsupportedPlatform { .. } => vec![
                "Run raceclips on Windows alongside iRacing",
                "Use a scripted telemetry source for cross-platform testing",
            ],
            ClipsError::Capture { .. } => vec![
                "Check that the primary display is active",
                "Close applications that block desktop duplication",
            ],
            ClipsError::EncoderUnavailable { .. } => vec![
                "Install FFmpeg (https://ffmpeg.org/download.html)",
                "Make sure the ffmpeg binary is on PATH",
            ],
            ClipsError::Encoder { .. } => vec![
                "Ensure the output directory is writable",
                "Ensure sufficient disk space",
                "Check that FFmpeg supports the requested codec",
            ],
            ClipsError::Recorder(_) => vec![
                "Stop the current recording before starting a new one",
                "Check the log for the worker failure",
            ],
            #[cfg(windows)]
            ClipsError::WindowsApi { .. } => vec![
                "Check Windows API permissions",
                "Verify system resources availability",
            ],
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        ClipsError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ClipsError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for missing telemetry channels.
    pub fn field_not_found(field: impl Into<String>) -> Self {
        ClipsError::FieldNotFound { field: field.into() }
    }

    /// Helper constructor for capture failures.
    pub fn capture_failed(reason: impl Into<String>) -> Self {
        ClipsError::Capture { reason: reason.into() }
    }

    /// Helper constructor for a missing encoder binary.
    pub fn encoder_unavailable(encoder: impl Into<String>, source: Option<std::io::Error>) -> Self {
        ClipsError::EncoderUnavailable { encoder: encoder.into(), source }
    }

    /// Helper constructor for encoder failures tied to an output file.
    pub fn encoder_failed(
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
        source: Option<std::io::Error>,
    ) -> Self {
        ClipsError::Encoder { path: path.into(), reason: reason.into(), source }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api_error(operation: impl Into<String>, source: core::Error) -> Self {
        ClipsError::WindowsApi { operation: operation.into(), source }
    }

    /// Helper constructor for unsupported platform errors.
    pub fn unsupported_platform(
        feature: impl Into<String>,
        required_platform: impl Into<String>,
    ) -> Self {
        ClipsError::UnsupportedPlatform {
            feature: feature.into(),
            required_platform: required_platform.into(),
        }
    }
}

#[cfg(windows)]
impl From<core::Error> for ClipsError {
    fn from(err: core::Error) -> Self {
        ClipsError::WindowsApi { operation: "Unknown Windows operation".to_string(), source: err }
    }
}
