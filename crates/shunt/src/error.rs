//! Unified error type and exit-code mapping.
//!
//! Every fallible path in the engine funnels into [`ShuntError`] so the CLI
//! can map failures to stable exit codes and a single JSON error shape.

use std::io;

use thiserror::Error;

use crate::namespace::NamespaceError;

pub type ShuntResult<T> = Result<T, ShuntError>;

#[derive(Debug, Error)]
pub enum ShuntError {
    /// Malformed command-line input that never reached the engine.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("no namespace pairs supplied")]
    EmptyRequests,

    #[error("namespace pair maps {namespace:?} to itself")]
    IdenticalPair { namespace: String },

    #[error("unknown import type {value:?} (expected \"import\" or \"from-import\")")]
    UnknownImportType { value: String },

    /// Exact matching against an empty request set can never match anything,
    /// so it is rejected up front.
    #[error("matching requires at least one request namespace unless partial matching is enabled")]
    EmptyMatchSet,

    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    #[error("path not found: {path}")]
    PathNotFound { path: String },

    #[error("{path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: shunt_cst::ParseError,
    },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ShuntError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        ShuntError::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ShuntError::Internal {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        ShuntError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<String>, source: shunt_cst::ParseError) -> Self {
        ShuntError::Parse {
            path: path.into(),
            source,
        }
    }
}

// ============================================================================
// Exit codes
// ============================================================================

/// Process exit codes for the CLI, grouped by failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Bad request shape: unparsable pairs, unknown filters, empty input.
    InvalidArgs = 2,
    /// Named inputs could not be resolved to files.
    ResolutionError = 3,
    /// A file could not be read, parsed, or written back.
    ApplyError = 4,
    /// Invariant violation inside the engine.
    InternalError = 10,
}

impl OutputErrorCode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<&ShuntError> for OutputErrorCode {
    fn from(err: &ShuntError) -> Self {
        match err {
            ShuntError::InvalidArguments { .. }
            | ShuntError::EmptyRequests
            | ShuntError::IdenticalPair { .. }
            | ShuntError::UnknownImportType { .. }
            | ShuntError::EmptyMatchSet
            | ShuntError::Namespace(_) => OutputErrorCode::InvalidArgs,
            ShuntError::PathNotFound { .. } => OutputErrorCode::ResolutionError,
            ShuntError::Parse { .. } | ShuntError::Io { .. } => OutputErrorCode::ApplyError,
            ShuntError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}
