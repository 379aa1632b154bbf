// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error hierarchy for the server core.
//!
//! Every fallible operation of the address space, the method dispatcher and
//! the lifecycle controller returns a [`ServerError`]. Errors map onto status
//! codes so the transport can report them to clients as fault codes.
//!
//! # Error Classes
//!
//! ```text
//! ServerError
//! ├── request scoped   - DuplicateIdentifier, UnknownNode, NotFound,
//! │                      AccessDenied, TypeMismatch, ArgumentsMissing,
//! │                      InvalidArgument, InternalError, Shutdown
//! └── fatal            - StartupFailure, CertificateInvalid
//! ```
//!
//! # Examples
//!
//! ```
//! use ctrl_core::error::ServerError;
//! use ctrl_core::types::{NodeId, StatusCode};
//!
//! let error = ServerError::not_found(NodeId::string(2, "Controls_Mode"));
//! assert!(error.is_request_scoped());
//! assert_eq!(error.status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
//! ```

use thiserror::Error;

use crate::types::{DataType, NodeId, NodeKind, StatusCode};

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

// =============================================================================
// ServerError
// =============================================================================

/// Errors raised by the server core.
#[derive(Debug, Clone, Error)]
pub enum ServerError {
    /// The identifier is already registered in the index.
    #[error("Duplicate node identifier: {node_id}")]
    DuplicateIdentifier {
        /// The conflicting identifier.
        node_id: NodeId,
    },

    /// A node referenced by the operation (parent, reference endpoint) is absent.
    #[error("Unknown node: {node_id}")]
    UnknownNode {
        /// The missing identifier.
        node_id: NodeId,
    },

    /// The node addressed by the request does not exist.
    #[error("Node not found: {node_id}")]
    NotFound {
        /// The requested identifier.
        node_id: NodeId,
    },

    /// The node does not permit the operation.
    #[error("Access denied on {node_id}: {operation}")]
    AccessDenied {
        /// The node.
        node_id: NodeId,
        /// The refused operation.
        operation: String,
    },

    /// The value or node kind does not match what the node declares.
    #[error("Type mismatch on {node_id}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The node.
        node_id: NodeId,
        /// What the node declares.
        expected: String,
        /// What was supplied.
        actual: String,
    },

    /// Fewer input arguments than the method declares.
    #[error("Method {method_id} expects {expected} argument(s), got {actual}")]
    ArgumentsMissing {
        /// The method node.
        method_id: NodeId,
        /// Declared input count.
        expected: usize,
        /// Supplied input count.
        actual: usize,
    },

    /// An input argument has the wrong kind or is not expected.
    #[error("Invalid argument {index} for method {method_id}: {message}")]
    InvalidArgument {
        /// The method node.
        method_id: NodeId,
        /// Zero based argument index.
        index: usize,
        /// Description.
        message: String,
    },

    /// Unexpected internal failure, reported to clients opaquely.
    #[error("Internal error: {message}")]
    InternalError {
        /// Description (logged, not sent to clients).
        message: String,
    },

    /// The address space is released or the server is draining.
    #[error("Server is shutting down: {message}")]
    Shutdown {
        /// Description.
        message: String,
    },

    /// Startup aborted.
    #[error("Startup failed: {message}")]
    StartupFailure {
        /// Description of the cause.
        message: String,
    },

    /// No usable application instance certificate.
    #[error("Application instance certificate invalid: {message}")]
    CertificateInvalid {
        /// Description of the cause.
        message: String,
    },
}

impl ServerError {
    /// Creates a duplicate identifier error.
    pub fn duplicate_identifier(node_id: NodeId) -> Self {
        Self::DuplicateIdentifier { node_id }
    }

    /// Creates an unknown node error.
    pub fn unknown_node(node_id: NodeId) -> Self {
        Self::UnknownNode { node_id }
    }

    /// Creates a not found error.
    pub fn not_found(node_id: NodeId) -> Self {
        Self::NotFound { node_id }
    }

    /// Creates an access denied error.
    pub fn access_denied(node_id: NodeId, operation: impl Into<String>) -> Self {
        Self::AccessDenied {
            node_id,
            operation: operation.into(),
        }
    }

    /// Creates a value type mismatch error.
    pub fn type_mismatch(node_id: NodeId, expected: DataType, actual: DataType) -> Self {
        Self::TypeMismatch {
            node_id,
            expected: expected.name().to_string(),
            actual: actual.name().to_string(),
        }
    }

    /// Creates a node kind mismatch error.
    pub fn kind_mismatch(node_id: NodeId, expected: NodeKind, actual: NodeKind) -> Self {
        Self::TypeMismatch {
            node_id,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Creates an arguments missing error.
    pub fn arguments_missing(method_id: NodeId, expected: usize, actual: usize) -> Self {
        Self::ArgumentsMissing {
            method_id,
            expected,
            actual,
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(method_id: NodeId, index: usize, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            method_id,
            index,
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Creates a shutdown error.
    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown {
            message: message.into(),
        }
    }

    /// Creates a startup failure.
    pub fn startup(message: impl Into<String>) -> Self {
        Self::StartupFailure {
            message: message.into(),
        }
    }

    /// Creates a certificate invalid error.
    pub fn certificate_invalid(message: impl Into<String>) -> Self {
        Self::CertificateInvalid {
            message: message.into(),
        }
    }

    /// Returns the status code reported to clients.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateIdentifier { .. } => StatusCode::BAD_NODE_ID_EXISTS,
            Self::UnknownNode { .. } => StatusCode::BAD_NODE_ID_INVALID,
            Self::NotFound { .. } => StatusCode::BAD_NODE_ID_UNKNOWN,
            Self::AccessDenied { .. } => StatusCode::BAD_USER_ACCESS_DENIED,
            Self::TypeMismatch { .. } => StatusCode::BAD_TYPE_MISMATCH,
            Self::ArgumentsMissing { .. } => StatusCode::BAD_ARGUMENTS_MISSING,
            Self::InvalidArgument { .. } => StatusCode::BAD_INVALID_ARGUMENT,
            Self::InternalError { .. } | Self::StartupFailure { .. } => {
                StatusCode::BAD_INTERNAL_ERROR
            }
            Self::Shutdown { .. } => StatusCode::BAD_SHUTDOWN,
            Self::CertificateInvalid { .. } => StatusCode::BAD_CERTIFICATE_INVALID,
        }
    }

    /// Returns `true` if the error aborts startup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StartupFailure { .. } | Self::CertificateInvalid { .. }
        )
    }

    /// Returns `true` if the error is reported to the calling session only.
    pub fn is_request_scoped(&self) -> bool {
        !self.is_fatal()
    }

    /// Returns `true` for failure kinds a method handler may legitimately report.
    pub fn is_expected_fault(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::UnknownNode { .. }
                | Self::AccessDenied { .. }
                | Self::TypeMismatch { .. }
                | Self::ArgumentsMissing { .. }
                | Self::InvalidArgument { .. }
                | Self::Shutdown { .. }
        )
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::DuplicateIdentifier { .. } => "duplicate_identifier",
            Self::UnknownNode { .. } => "unknown_node",
            Self::NotFound { .. } => "not_found",
            Self::AccessDenied { .. } => "access_denied",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::ArgumentsMissing { .. } => "arguments_missing",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::InternalError { .. } => "internal_error",
            Self::Shutdown { .. } => "shutdown",
            Self::StartupFailure { .. } => "startup_failure",
            Self::CertificateInvalid { .. } => "certificate_invalid",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mode() -> NodeId {
        NodeId::string(2, "Controls_Mode")
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServerError::duplicate_identifier(mode()).status_code(),
            StatusCode::BAD_NODE_ID_EXISTS
        );
        assert_eq!(
            ServerError::access_denied(mode(), "write").status_code(),
            StatusCode::BAD_USER_ACCESS_DENIED
        );
        assert_eq!(
            ServerError::arguments_missing(mode(), 2, 1).status_code(),
            StatusCode::BAD_ARGUMENTS_MISSING
        );
        assert_eq!(
            ServerError::shutdown("released").status_code(),
            StatusCode::BAD_SHUTDOWN
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ServerError::startup("boom").is_fatal());
        assert!(ServerError::certificate_invalid("missing").is_fatal());
        assert!(ServerError::not_found(mode()).is_request_scoped());
        assert!(!ServerError::internal("x").is_expected_fault());
        assert!(ServerError::invalid_argument(mode(), 0, "x").is_expected_fault());
    }

    #[test]
    fn test_display() {
        let err = ServerError::type_mismatch(mode(), DataType::Int16, DataType::Double);
        assert_eq!(
            err.to_string(),
            "Type mismatch on ns=2;s=Controls_Mode: expected Int16, got Double"
        );
        assert_eq!(err.error_type(), "type_mismatch");
    }
}
