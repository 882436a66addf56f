//! Error types for the `sse` crate.

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Errors raised while framing or transmitting an event.
///
/// Every variant is fatal to the session that produced it; the session driver
/// never retries a failed write.
#[derive(Debug)]
pub enum Error {
    /// The underlying transport rejected a write or flush. The connection is
    /// presumed gone.
    Io(io::Error),

    /// An identifier or type tag contained a line break and would have broken
    /// the frame boundaries. Nothing was written.
    InvalidField { field: &'static str },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "Transport write failed: {}", e),
            Error::InvalidField { field } => {
                write!(f, "Field `{}` must not contain line breaks", field)
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::InvalidField { .. } => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
