//! Framework error types for the dispatch pipeline.

use http::{Method, StatusCode};
use thiserror::Error;

use crate::template::TemplateError;

/// Errors a view or the dispatcher can produce.
///
/// Every variant maps to an HTTP status code; unhandled errors become
/// the matching error page.
#[derive(Debug, Error)]
pub enum HttpError {
    /// No rule matched the request path.
    #[error("not found: {0}")]
    NotFound(String),

    /// The path matched but the method is not accepted.
    #[error("method not allowed")]
    MethodNotAllowed {
        /// Methods the matched rules accept.
        allowed: Vec<Method>,
    },

    #[error("bad request: {0}")]
    BadRequest(String),

    /// A bare status error, as produced by [`abort`].
    #[error("{0}")]
    Status(StatusCode),

    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Anything the framework cannot express more precisely.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HttpError {
    /// The HTTP status code this error renders as.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Status(code) => *code,
            Self::Template(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Abort request handling with the given status code.
///
/// The view-side counterpart of raising an HTTP exception:
/// `return Err(abort(401))`. Unknown codes fall back to 500.
#[must_use]
pub fn abort(code: u16) -> HttpError {
    match StatusCode::from_u16(code) {
        Ok(status) => HttpError::Status(status),
        Err(_) => HttpError::Status(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
