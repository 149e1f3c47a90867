// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the streaming engine

use std::fmt;
use std::path::PathBuf;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Top-level error type used by the command line front end
#[derive(Debug, Clone)]
pub enum AppError {
    /// Device or decoder errors
    Backend(BackendError),
    /// Path classification errors
    Classification(ClassificationError),
    /// Configuration errors
    Config(ConfigError),
    /// Generic error with message
    Other(String),
}

/// Error types for backend operations (decoders and virtual devices)
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Integration is not available on this system (plugin or device missing)
    NotAvailable(String),
    /// Failed to initialize the media framework or build a pipeline
    InitializationFailed(String),
    /// Media file is missing, corrupt or unreadable
    SourceOpen(String),
    /// Virtual camera or microphone could not be opened
    DeviceOpen(String),
    /// Frame or buffer does not match the negotiated format
    FormatNotSupported(String),
    /// Error raised while data was flowing
    Stream(String),
    /// Other errors
    Other(String),
}

/// Reasons a path is rejected by the media classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    /// Regular file with an extension outside the known sets
    Unsupported(PathBuf),
    /// Path is neither a regular file nor a directory
    NotFound(PathBuf),
}

/// Configuration file errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Reading or writing the file failed
    Io(String),
    /// The file exists but is not valid JSON for `Config`
    Parse(String),
    /// No configuration directory could be determined
    NoConfigDir,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Backend(e) => write!(f, "Backend error: {}", e),
            AppError::Classification(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::SourceOpen(msg) => write!(f, "Could not open source: {}", msg),
            BackendError::DeviceOpen(msg) => write!(f, "Could not open device: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::Stream(msg) => write!(f, "Stream error: {}", msg),
            BackendError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ClassificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationError::Unsupported(path) => {
                write!(f, "Unsupported file format: {}", path.display())
            }
            ClassificationError::NotFound(path) => {
                write!(f, "File or directory not found: {}", path.display())
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Invalid config file: {}", msg),
            ConfigError::NoConfigDir => write!(f, "No configuration directory available"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for BackendError {}
impl std::error::Error for ClassificationError {}
impl std::error::Error for ConfigError {}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<ClassificationError> for AppError {
    fn from(err: ClassificationError) -> Self {
        AppError::Classification(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
