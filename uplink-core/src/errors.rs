//! # Errors
//!
//! One structured error type for the whole upload pipeline. The variants map
//! directly onto the failure classes a client can act on:
//!
//! - `Validation` / `Authorization` are user-correctable and always returned
//!   inline per file, never thrown across a batch boundary.
//! - `Configuration` is fatal and aborts the whole call.
//! - `Transfer` is transient and retryable by re-authorizing.
//! - `RouteNotFound` / `Protocol` are request-shape problems.
//!
//! Middleware and hook closures run on `anyhow::Result`; `normalize` turns
//! whatever comes out of them back into an `UploadError` (lossless when the
//! closure already produced one).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors raised anywhere in the authorize → transfer → complete pipeline.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Validation failed at '{path}': {message}")]
    Validation {
        code: String,
        message: String,
        path: String,
    },

    #[error("Authorization rejected: {message}")]
    Authorization { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Transfer failed: {message}")]
    Transfer { message: String },

    #[error("Route not found: {route}")]
    RouteNotFound { route: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },
}

impl UploadError {
    pub fn validation<C, M, P>(code: C, message: M, path: P) -> Self
    where
        C: Into<String>,
        M: Into<String>,
        P: Into<String>,
    {
        Self::Validation {
            code: code.into(),
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn authorization<S: Into<String>>(message: S) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn transfer<S: Into<String>>(message: S) -> Self {
        Self::Transfer {
            message: message.into(),
        }
    }

    pub fn route_not_found<S: Into<String>>(route: S) -> Self {
        Self::RouteNotFound {
            route: route.into(),
        }
    }

    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for clients.
    ///
    /// Validation errors carry their own per-constraint code (for example
    /// `too_large`); every other variant has a fixed one.
    pub fn error_code(&self) -> &str {
        match self {
            UploadError::Validation { code, .. } => code,
            UploadError::Authorization { .. } => "authorization_failed",
            UploadError::Configuration { .. } => "configuration_error",
            UploadError::Transfer { .. } => "transfer_failed",
            UploadError::RouteNotFound { .. } => "route_not_found",
            UploadError::Protocol { .. } => "protocol_error",
        }
    }

    /// Suggested HTTP status for a batch-level failure.
    pub fn status_code(&self) -> u16 {
        match self {
            UploadError::Validation { .. } => 422,
            UploadError::Authorization { .. } => 403,
            UploadError::Configuration { .. } => 500,
            UploadError::Transfer { .. } => 502,
            UploadError::RouteNotFound { .. } => 404,
            UploadError::Protocol { .. } => 400,
        }
    }

    /// Whether the caller may usefully retry the same operation.
    pub fn retryable(&self) -> bool {
        matches!(self, UploadError::Transfer { .. })
    }

    /// Inline wire form carried per file inside a batch response.
    pub fn to_detail(&self) -> ErrorDetail {
        ErrorDetail {
            code: self.error_code().to_string(),
            message: self.to_string(),
        }
    }

    /// Turn any error coming out of a middleware/hook closure into an
    /// `UploadError`:
    /// - if it's already an `UploadError`, keep it (lossless)
    /// - otherwise treat it as a middleware rejection
    pub fn normalize(err: anyhow::Error) -> UploadError {
        match err.downcast::<UploadError>() {
            Ok(upload) => upload,
            Err(other) => UploadError::authorization(other.to_string()),
        }
    }
}

/// Machine-readable error payload carried inline per file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
