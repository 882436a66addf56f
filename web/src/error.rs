use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

/// Failures that are reported to the caller before any streaming begins.
///
/// Once a stream is open nothing is reported back; a broken connection
/// simply ends its session.
#[derive(Debug)]
pub enum Error {
    /// The streaming response could not be set up.
    StreamingUnsupported(axum::http::Error),
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::StreamingUnsupported(e) => Some(e),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        match self {
            Error::StreamingUnsupported(e) => write!(fmt, "streaming unsupported: {e}"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::StreamingUnsupported(e) => {
                error!("Rejecting stream request: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "streaming unsupported").into_response()
            }
        }
    }
}

impl From<axum::http::Error> for Error {
    fn from(err: axum::http::Error) -> Self {
        Error::StreamingUnsupported(err)
    }
}
