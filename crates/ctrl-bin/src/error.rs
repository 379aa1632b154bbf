// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the ctrl binary.

use thiserror::Error;

/// Result type alias for ctrl-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that can occur in the ctrl binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Runtime error.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Config loading error.
    #[error("Config error: {0}")]
    Config(#[from] ctrl_config::ConfigError),

    /// Server error.
    #[error("Server error: {0}")]
    Server(#[from] ctrl_core::ServerError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        /// The context description.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a runtime error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Adds context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the exit code for this error.
    ///
    /// Startup failures of the server exit with 2, failures while serving
    /// with 3.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Config(_) => 1,
            Self::Server(e) if e.is_fatal() => 2,
            Self::Runtime(_) | Self::Server(_) => 3,
            Self::Io(_) => 4,
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Runtime(err.to_string())
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Reports an error with its cause chain on stderr.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

/// Reports an error and exits with the appropriate code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ctrl_core::ServerError;

    #[test]
    fn test_error_with_context() {
        let err = BinError::config("inner error").with_context("outer context");
        assert_eq!(err.to_string(), "outer context: Configuration error: inner error");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BinError::config("test").exit_code(), 1);
        assert_eq!(BinError::from(ServerError::startup("root exists")).exit_code(), 2);
        assert_eq!(
            BinError::from(ServerError::certificate_invalid("missing")).exit_code(),
            2
        );
        assert_eq!(BinError::from(ServerError::internal("boom")).exit_code(), 3);
        assert_eq!(BinError::runtime("test").exit_code(), 3);
        assert_eq!(BinError::Io("test".to_string()).exit_code(), 4);
        assert_eq!(
            BinError::from(ctrl_config::ConfigError::file_not_found("x.yaml")).exit_code(),
            1
        );
    }
}
