//! Error taxonomy returned to callers of `generateProfilePicture`.

use rmcp::{ErrorData as McpError, model::ErrorCode};

/// Message returned for any failure that is not already a [`GenerationError`].
pub const GENERIC_FAILURE_MESSAGE: &str = "Generation failed, please retry later.";

/// MCP error code used for [`GenerationError::Unauthenticated`].
pub const MCP_UNAUTHENTICATED: ErrorCode = ErrorCode(-32001);
/// MCP error code used for [`GenerationError::FailedPrecondition`].
pub const MCP_FAILED_PRECONDITION: ErrorCode = ErrorCode(-32002);

/// Typed failure of a generation request.
///
/// Each variant carries the caller-facing message. Anything that is not one of
/// these is collapsed into [`GenerationError::Internal`] by [`sanitize`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// No verified caller identity on the request.
    #[error("{0}")]
    Unauthenticated(String),

    /// Malformed input or an unusable source image.
    #[error("{0}")]
    InvalidArgument(String),

    /// Deployment is missing something it needs, e.g. the model credential.
    #[error("{0}")]
    FailedPrecondition(String),

    /// The model returned nothing usable, or an unexpected failure occurred.
    #[error("{0}")]
    Internal(String),
}

impl GenerationError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::FailedPrecondition(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Status string used by the callable wire protocol.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::FailedPrecondition(_) => "FAILED_PRECONDITION",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// HTTP status for the callable wire protocol.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unauthenticated(_) => 401,
            Self::InvalidArgument(_) | Self::FailedPrecondition(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Unauthenticated(message)
            | Self::InvalidArgument(message)
            | Self::FailedPrecondition(message)
            | Self::Internal(message) => message,
        }
    }
}

impl From<GenerationError> for McpError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Unauthenticated(message) => {
                McpError::new(MCP_UNAUTHENTICATED, message, None)
            }
            GenerationError::InvalidArgument(message) => McpError::invalid_params(message, None),
            GenerationError::FailedPrecondition(message) => {
                McpError::new(MCP_FAILED_PRECONDITION, message, None)
            }
            GenerationError::Internal(message) => McpError::internal_error(message, None),
        }
    }
}

/// Logs `err` with full detail and returns the caller-facing error.
///
/// A [`GenerationError`] anywhere in the chain passes through unchanged,
/// everything else becomes a generic [`GenerationError::Internal`].
pub fn sanitize(err: anyhow::Error) -> GenerationError {
    tracing::error!(error = ?err, "Generation failed");
    match err.downcast::<GenerationError>() {
        Ok(typed) => typed,
        Err(_) => GenerationError::internal(GENERIC_FAILURE_MESSAGE),
    }
}
