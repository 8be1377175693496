//! Public error types for the brisk API.
//!
//! This module defines the error types exposed to library users. Errors of
//! the individual stages are wrapped, not flattened, so callers can still
//! match on the exact compile or runtime failure.

use core::fmt;

use thiserror::Error;

use crate::analyzer::CompileError;
use crate::coercion::ConversionError;
use crate::evaluator::{ExecutionError, ResourceExceededError, RuntimeError};
use crate::parser::{ParseError, Span};

/// Public error type for all brisk operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Parsing or analysis failed.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A value could not be coerced at a typed boundary.
    #[error(transparent)]
    Conversion(ConversionError),

    /// Evaluation failed, including errors raised by host members.
    #[error(transparent)]
    Runtime(RuntimeError),

    /// Resource limits exceeded (e.g., stack overflow, iteration limit).
    #[error(transparent)]
    ResourceExceeded(#[from] ResourceExceededError),

    /// A persisted expression could not be written or reconstructed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Invalid API usage (e.g., an unknown accessor strategy name).
    #[error("API error: {0}")]
    Api(String),
}

impl Error {
    /// Diagnostics for compile errors; empty for every other kind.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Error::Compile(err) => vec![err.to_diagnostic()],
            _ => Vec::new(),
        }
    }
}

impl From<RuntimeError> for Error {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Conversion(conversion) => Error::Conversion(conversion),
            other => Error::Runtime(other),
        }
    }
}

impl From<ConversionError> for Error {
    fn from(err: ConversionError) -> Self {
        Error::Conversion(err)
    }
}

impl From<ExecutionError> for Error {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Runtime(runtime) => runtime.into(),
            ExecutionError::ResourceExceeded(resource) => Error::ResourceExceeded(resource),
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Compile(err.into())
    }
}

/// A diagnostic message (error, warning, or info) with source location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level (error, warning, info).
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Source location of the primary issue.
    pub span: Span,

    /// Related locations that provide additional context.
    pub related: Vec<RelatedInfo>,

    /// Optional help text suggesting how to fix the issue.
    pub help: Option<String>,

    /// Optional error code (e.g., "E001") for documentation lookup.
    pub code: Option<String>,
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - compilation cannot succeed.
    Error,
    /// Warning - suspicious code that might be wrong.
    Warning,
    /// Info - informational message.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Related information for a diagnostic (e.g., "declared here").
#[derive(Debug, Clone)]
pub struct RelatedInfo {
    /// Source location of the related information.
    pub span: Span,

    /// Message explaining the relevance.
    pub message: String,
}
