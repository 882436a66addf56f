//! This module holds typed parameters for endpoint inputs.
//!
//! Stream parameters are deliberately kept as raw strings: a value that does
//! not parse is normalized to a default by the `sse` crate rather than being
//! rejected by the extractor.

pub(crate) mod stream;
