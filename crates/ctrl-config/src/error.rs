// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration error types for ctrl-config.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration file.
    #[error("Failed to parse config file '{path}': {message}")]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// File I/O error.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file does not exist.
    #[error("Config file not found: {path}")]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Invalid environment variable value.
    #[error("Invalid value for environment variable '{name}': {message}")]
    InvalidEnvVar {
        /// Variable name.
        name: String,
        /// Error message.
        message: String,
    },

    /// Value outside its allowed range.
    #[error("Value for '{field}' out of range: {value} (allowed {min}..{max})")]
    OutOfRange {
        /// The field.
        field: String,
        /// The offending value.
        value: String,
        /// Lower bound.
        min: String,
        /// Upper bound.
        max: String,
    },

    /// Unsupported file format.
    #[error("Unsupported config format: {format}")]
    UnsupportedFormat {
        /// The extension that was found.
        format: String,
    },

    /// Serialization or deserialization failure without a file context.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    /// Creates a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a file-not-found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates an invalid environment variable error.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an out-of-range error.
    pub fn out_of_range(
        field: impl Into<String>,
        value: impl ToString,
        min: impl ToString,
        max: impl ToString,
    ) -> Self {
        Self::OutOfRange {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    /// Creates an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns a short message suitable for the terminal.
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Parse { path, message } => {
                format!("Cannot parse {}: {}", path.display(), message)
            }
            ConfigError::Validation { field, message } => {
                format!("Invalid setting {}: {}", field, message)
            }
            ConfigError::Io { path, .. } => format!("Cannot read {}", path.display()),
            ConfigError::FileNotFound { path } => format!("No such file: {}", path.display()),
            ConfigError::InvalidEnvVar { name, message } => {
                format!("Invalid environment variable {}: {}", name, message)
            }
            ConfigError::OutOfRange { field, value, min, max } => {
                format!("{} = {} is outside {}..{}", field, value, min, max)
            }
            ConfigError::UnsupportedFormat { format } => {
                format!("Unsupported config format: {}", format)
            }
            ConfigError::Serialization { message } => message.clone(),
        }
    }

    /// Returns `true` if this error is related to file I/O.
    pub fn is_io_error(&self) -> bool {
        matches!(self, ConfigError::Io { .. } | ConfigError::FileNotFound { .. })
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            ConfigError::Parse { .. } => "parse",
            ConfigError::Validation { .. } => "validation",
            ConfigError::Io { .. } => "io",
            ConfigError::FileNotFound { .. } => "file_not_found",
            ConfigError::InvalidEnvVar { .. } => "invalid_env_var",
            ConfigError::OutOfRange { .. } => "out_of_range",
            ConfigError::UnsupportedFormat { .. } => "unsupported_format",
            ConfigError::Serialization { .. } => "serialization",
        }
    }
}

/// A Result type with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type() {
        assert_eq!(ConfigError::validation("endpoints", "empty").error_type(), "validation");
        assert_eq!(ConfigError::unsupported_format("ini").error_type(), "unsupported_format");
        assert_eq!(
            ConfigError::invalid_env_var("CTRL_AUTO_ACCEPT", "bad").error_type(),
            "invalid_env_var"
        );
    }

    #[test]
    fn test_is_io_error() {
        let error = ConfigError::io(
            "ctrl.yaml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(error.is_io_error());
        assert!(ConfigError::file_not_found("ctrl.yaml").is_io_error());
        assert!(!ConfigError::validation("x", "y").is_io_error());
    }

    #[test]
    fn test_user_message() {
        let msg = ConfigError::out_of_range("simulation.perturbation", -1, 0, 1).user_message();
        assert!(msg.contains("simulation.perturbation"));
        assert!(msg.contains("-1"));
    }
}
