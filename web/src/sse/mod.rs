//! SSE HTTP handler for the web layer.
//!
//! This module contains only the Axum handler for the stream endpoint.
//! The streaming core (Session, FrameEncoder, parameter resolution)
//! lives in the `sse` crate so it can be driven without HTTP.

pub mod handler;
